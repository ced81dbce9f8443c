pub mod completion;
pub mod spelling;

use serde::{Deserialize, Serialize};
use crate::suggest::completion::Completion;
use crate::suggest::spelling::WordCorrections;

/// Suggestions attached to a result when the query asks for them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub completions: Vec<Completion>,
    pub spelling: Vec<WordCorrections>,
}
