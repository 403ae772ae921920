//! depsweep - Find and safely remove unused npm dependencies
//!
//! This library scans a JavaScript/TypeScript project for references to the
//! packages its `package.json` declares, and removes the unreferenced ones
//! through isolated, verified, revertible transactions.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! 1. **Manifest loading** - Read declared dependencies from `package.json`
//! 2. **File Discovery** - Find source files, honouring ignore lists
//! 3. **Scanning** - Extract package references in parallel
//! 4. **Analysis** - Diff declared against referenced dependencies
//! 5. **Transactions** - Branch, uninstall, verify, commit or revert
//! 6. **Reporting** - Terminal or JSON output

pub mod cancel;
pub mod cleanup;
pub mod config;
pub mod discovery;
pub mod manifest;
pub mod queue;
pub mod report;
pub mod scanner;
pub mod transaction;
pub mod usage;

pub use cancel::CancellationToken;
pub use cleanup::{Cleanup, CleanupOptions};
pub use config::Config;
pub use discovery::FileFinder;
pub use manifest::{DependencyRecord, Manifest, ManifestError};
pub use queue::{ErrorKind, ErrorQueue, ErrorQueueItem, ErrorSink};
pub use report::{ReportFormat, Reporter, RunReport};
pub use scanner::{ImportMatcher, RegexImportMatcher, SourceScanner};
pub use transaction::{FatalError, TransactionExecutor, TransactionState};
pub use usage::{UnusedSet, UsageAnalyzer, UsageIndex};
