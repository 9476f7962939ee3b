pub mod artifact;
pub mod records;
