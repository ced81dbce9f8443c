pub mod inverted;
pub mod posting;
pub mod term_vector;
