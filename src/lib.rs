// Tredgate Loans - Core Library
// Record service + storage access, used by the CLI, the TUI and tests

pub mod config;
pub mod error;
pub mod import;
pub mod loan;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{LoanError, StorageError, ValidationError};
pub use import::{export_csv, import_csv, ImportReport};
pub use loan::{
    decide, monthly_payment, Decision, LoanApplication, LoanStatus, LoanSummary,
    NewLoanApplication, AUTO_APPROVE_MAX_AMOUNT, AUTO_APPROVE_MAX_TERM_MONTHS,
};
pub use service::LoanService;
pub use storage::{
    KeyValueStore, KvLoanStorage, LoanStorage, MemoryStore, SqliteStore, STORAGE_KEY,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service backed by the durable SQLite key-value store
pub type SqliteLoanService = LoanService<KvLoanStorage<SqliteStore>>;

/// Open the SQLite-backed service at `path`
pub fn open_service<P: AsRef<std::path::Path>>(path: P) -> Result<SqliteLoanService, StorageError> {
    Ok(LoanService::new(KvLoanStorage::new(SqliteStore::open(path)?)))
}
