pub mod id;
pub mod model;
pub mod printer;
pub mod selector;
pub mod storage;

pub use id::generate_id;
pub use model::{ClearReport, IterationResult, RunMode, RunRecord, RunSummary};
pub use printer::list_history;
pub use selector::{SelectionStrategy, select_run};
pub use storage::RunStore;
