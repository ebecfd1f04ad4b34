pub mod client;
pub mod response;
pub mod script;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::{CommandRunner, ScriptRunner};
pub use response::ResponseParser;
pub use types::{ExecutionOutcome, ProcessOutput};
