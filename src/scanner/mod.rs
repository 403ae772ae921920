//! Source scanning: find package references in JavaScript/TypeScript files

mod events;
mod matcher;
mod source_scanner;

pub use events::{Finding, UsageEvents};
pub use matcher::{package_name, ImportMatch, ImportMatcher, RegexImportMatcher};
pub use source_scanner::{ScanOutcome, SourceScanner};
