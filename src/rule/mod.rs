pub mod document;
pub mod metadata;
pub mod parser;
pub mod record;

mod header;
mod normalize;

pub use crate::types::identifiers::{ContentHash, RuleId};
pub use document::{DocumentError, RuleDocument};
pub use metadata::{Metadata, MetadataValue};
pub use parser::{parse, parse_document, ParseError};
pub use record::{ContextTier, Relation, RelationKind, RuleRecord};
