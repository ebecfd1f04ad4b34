pub mod assertion;
pub mod error;
pub mod history;
pub mod http;
pub mod logger;
pub mod parser;
pub mod runner;
pub mod table;
pub mod utils;
pub mod variable;

// Re-export commonly used types
pub use error::{Result, RucurlError};
