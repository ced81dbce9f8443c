use crate::analysis::filter::TokenFilter;
use crate::analysis::token::{Token, TokenType};
use crate::core::config::{EdgeSide, NGramConfig, NGramMode};

/// Edge n-grams anchored at the front or back of each token
pub struct EdgeNGramFilter {
    pub min_gram: usize,
    pub max_gram: usize,
    pub side: EdgeSide,
    pub mode: NGramMode,
}

impl EdgeNGramFilter {
    pub fn new(config: &NGramConfig) -> Self {
        EdgeNGramFilter {
            min_gram: config.min_gram,
            max_gram: config.max_gram,
            side: config.side,
            mode: config.mode,
        }
    }
}

impl TokenFilter for EdgeNGramFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut result = Vec::new();

        for token in tokens {
            let chars: Vec<char> = token.text.chars().collect();
            let upper = self.max_gram.min(chars.len());

            for n in self.min_gram..=upper {
                // The full token is emitted once below in append mode
                if n == chars.len() && self.mode == NGramMode::Append {
                    continue;
                }
                let gram: String = match self.side {
                    EdgeSide::Front => chars[..n].iter().collect(),
                    EdgeSide::Back => chars[chars.len() - n..].iter().collect(),
                };
                // A gram spanning the whole token keeps the token's type
                let token_type = if n == chars.len() { token.token_type } else { TokenType::NGram };
                result.push(token.derive(gram, token_type));
            }

            if self.mode == NGramMode::Append {
                result.push(token);
            }
        }

        result
    }

    fn name(&self) -> &str {
        "edge_ngram"
    }

    fn index_only(&self) -> bool {
        true
    }
}
