pub mod executor;
pub mod facet;
pub mod highlight;
pub mod results;
