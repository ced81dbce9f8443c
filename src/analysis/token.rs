/// Token produced by the analysis chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,     // Ordinal of the source word; not kept in postings
    pub offset: usize,     // Byte offset in the lowercased source text
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Word,
    Number,
    NGram,
    Synonym,
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        let token_type = if text.chars().all(|c| c.is_ascii_digit()) {
            TokenType::Number
        } else {
            TokenType::Word
        };
        Token {
            text,
            position,
            offset,
            token_type,
        }
    }

    /// Derived token sharing this token's position
    pub fn derive(&self, text: String, token_type: TokenType) -> Self {
        Token {
            text,
            position: self.position,
            offset: self.offset,
            token_type,
        }
    }
}
