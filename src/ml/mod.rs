//! Tree-ensemble classifiers and the preprocessing and validation around them.

pub mod boosting;
pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod smote;
pub mod table;
pub mod tree;
pub mod validation;
