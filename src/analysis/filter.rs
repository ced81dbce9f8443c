use crate::analysis::token::Token;

pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;

    /// Filters that only apply when indexing field text, never to query text
    fn index_only(&self) -> bool {
        false
    }
}
