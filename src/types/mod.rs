pub mod identifiers;
pub mod selection;

pub use identifiers::{ContentHash, RuleId, RuleIdError};
pub use selection::{
    ExcludedRule, ExclusionReason, InclusionReason, ScoreDetails, ScoredRule, SelectedRule,
    SelectionMetadata, SelectionRequest, SelectionResult, SelectionWarning, SelectionWhy,
};
