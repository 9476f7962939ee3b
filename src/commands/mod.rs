pub mod ast;
pub mod dataset;
pub mod git;
pub mod scoring;
pub mod settings;
pub mod store;
pub mod train;
