pub mod churn;
pub mod complexity;
pub mod join;
pub mod knowledge;
pub mod labeling;
pub mod language;
pub mod maintainability;
pub mod raw;
pub mod syntax;
