use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::{Token, TokenType};
use crate::core::config::StemmerAlgorithm;

pub struct StemmerFilter {
    pub algorithm: StemmerAlgorithm,
}

impl StemmerFilter {
    pub fn new(algorithm: StemmerAlgorithm) -> Self {
        StemmerFilter { algorithm }
    }
}

/// Suffix stripper: a trailing "s" on words longer than three characters,
/// then "ing", then "ed". The plural goes first so "meetings" and "meeting"
/// share a stem. A suffix strip never leaves fewer than two characters.
pub fn light_stem(word: &str) -> String {
    let mut stem = word.to_string();

    if stem.chars().count() > 3 && stem.ends_with('s') && !stem.ends_with("ss") {
        stem.pop();
    }

    for suffix in ["ing", "ed"] {
        if stem.ends_with(suffix) && stem.chars().count() >= suffix.len() + 2 {
            stem.truncate(stem.len() - suffix.len());
        }
    }

    stem
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let snowball = match self.algorithm {
            StemmerAlgorithm::Porter => Some(Stemmer::create(Algorithm::English)),
            StemmerAlgorithm::Light => None,
        };

        tokens.into_iter()
            .map(|mut token| {
                if token.token_type == TokenType::Number {
                    return token;
                }
                token.text = match &snowball {
                    Some(stemmer) => stemmer.stem(&token.text).to_string(),
                    None => light_stem(&token.text),
                };
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "stemmer"
    }
}
