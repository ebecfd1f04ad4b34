pub mod executor;
pub mod reporter;
pub mod types;

pub use executor::Orchestrator;
pub use reporter::RunReporter;
pub use types::{RunOutcome, RunRequest, SingleRunView};
