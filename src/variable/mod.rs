pub mod config;
pub mod dialect;
pub mod resolver;
pub mod types;

pub use config::ConfigLoader;
pub use dialect::ShellDialect;
pub use resolver::TemplateResolver;
pub use types::{Environment, Settings, VariableBatch, VariableConfig, VariableSet};
