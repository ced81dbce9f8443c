pub mod ast;
pub mod expander;
pub mod filter;
pub mod sort;
