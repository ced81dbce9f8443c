use crate::analysis::token::Token;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Lowercases, treats every non-word character as whitespace and splits.
#[derive(Clone)]
pub struct StandardTokenizer {
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            max_token_length: 255,
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut position = 0u32;
        let mut start: Option<usize> = None;

        let boundary = std::iter::once((lowered.len(), ' '));
        for (idx, ch) in lowered.char_indices().chain(boundary) {
            if is_word_char(ch) {
                start.get_or_insert(idx);
                continue;
            }
            if let Some(begin) = start.take() {
                let word = &lowered[begin..idx];
                if word.chars().count() <= self.max_token_length {
                    tokens.push(Token::new(word.to_string(), position, begin));
                    position += 1;
                }
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn strips_punctuation_and_lowercases() {
        let tokens = StandardTokenizer::default().tokenize("Hello, World!  It's 2024...");
        assert_eq!(texts(&tokens), vec!["hello", "world", "it", "s", "2024"]);
        assert_eq!(tokens[4].token_type, TokenType::Number);
        assert_eq!(tokens[1].offset, 7);
    }

    #[test]
    fn empty_and_symbol_only_input_yield_nothing() {
        let tokenizer = StandardTokenizer::default();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("?!  --- ...").is_empty());
    }

    #[test]
    fn keeps_unicode_letters() {
        let tokens = StandardTokenizer::default().tokenize("Café crème_brûlée");
        assert_eq!(texts(&tokens), vec!["café", "crème_brûlée"]);
    }

    #[test]
    fn drops_overlong_tokens() {
        let tokenizer = StandardTokenizer { max_token_length: 4 };
        assert_eq!(texts(&tokenizer.tokenize("tiny enormous")), vec!["tiny"]);
    }
}
