use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;
use crate::analysis::analyzer::Analyzer;
use crate::query::ast::HighlightRequest;

struct Segment<'a> {
    start: usize,
    text: &'a str,
    hit: bool,
}

impl Segment<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Marks words of `text` whose analysis shares a term with the query.
///
/// Returns up to `number_of_fragments` windows of roughly `fragment_size`
/// bytes around matches, or the whole text when `fragment_size` is 0. No
/// match, no fragments.
pub fn highlight(
    text: &str,
    query_terms: &HashSet<String>,
    analyzer: &Analyzer,
    request: &HighlightRequest,
) -> Vec<String> {
    let segments: Vec<Segment> = text
        .split_word_bound_indices()
        .map(|(start, word)| Segment {
            start,
            text: word,
            hit: analyzer.query_terms(word).iter().any(|t| query_terms.contains(t)),
        })
        .collect();

    if !segments.iter().any(|s| s.hit) || request.number_of_fragments == 0 {
        return Vec::new();
    }
    if request.fragment_size == 0 {
        return vec![render(&segments, request)];
    }

    let half = request.fragment_size / 2;
    let mut fragments = Vec::new();
    let mut covered_until = 0;

    for (idx, segment) in segments.iter().enumerate() {
        if !segment.hit || segment.start < covered_until {
            continue;
        }

        let window_start = segment.start.saturating_sub(half);
        let window_end = (window_start + request.fragment_size).max(segment.end());

        let first = segments[..=idx]
            .iter()
            .position(|s| s.end() > window_start)
            .unwrap_or(idx);
        let last = segments[idx..]
            .iter()
            .rposition(|s| s.start < window_end)
            .map(|offset| idx + offset)
            .unwrap_or(idx);

        covered_until = segments[last].end();
        fragments.push(render(&segments[first..=last], request).trim().to_string());
        if fragments.len() >= request.number_of_fragments {
            break;
        }
    }

    fragments
}

fn render(segments: &[Segment], request: &HighlightRequest) -> String {
    let mut out = String::new();
    for segment in segments {
        if segment.hit {
            out.push_str(&request.pre_tag);
            out.push_str(segment.text);
            out.push_str(&request.post_tag);
        } else {
            out.push_str(segment.text);
        }
    }
    out
}
