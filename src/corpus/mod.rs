pub mod manifest;
pub mod snapshot;
pub mod source;
pub mod store;

pub use manifest::{CorpusManifest, ManifestRuleEntry};
pub use snapshot::{BudgetDrift, CorpusDiagnostic, CorpusSnapshot, DiagnosticKind, RejectReason, RejectedDocument};
pub use source::{ContentSource, DirectorySource, MemorySource, SourceEntry, SourceError};
pub use store::CorpusStore;
