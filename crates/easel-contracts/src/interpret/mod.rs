pub mod expr;
pub mod hints;
mod naive;
mod result;
mod rules;

pub use naive::{extract_subject, fallback_naive, label_card};
pub use result::{InterpretationResult, Provenance};
pub use rules::interpret_by_rules;
