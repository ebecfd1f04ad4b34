pub mod formatter;

pub use formatter::{OutcomeFormat, OutcomeFormatter};
