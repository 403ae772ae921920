mod loader;

pub use loader::{glob_match, Config, FinishMode, PackageManagerKind, ReportConfig, TransactionConfig, VerifyConfig, VerifyMode};
