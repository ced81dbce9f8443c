pub mod ngram;
pub mod stemmer;
pub mod stopword;
pub mod synonym;
