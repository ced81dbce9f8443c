pub mod boost;
pub mod scorer;
