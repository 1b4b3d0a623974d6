use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use super::document::RuleDocument;
use super::header::{self, FieldLine};
use super::metadata::{Metadata, MetadataValue};
use super::normalize;
use super::record::{ContextTier, Relation, RelationKind, RuleRecord};
use crate::config::IdFallback;
use crate::types::identifiers::{ContentHash, RuleId, RuleIdError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Missing mandatory field: {0}")]
    MissingField(&'static str),
    #[error("Malformed dependency reference in {field}: {value:?}")]
    MalformedDependency { field: &'static str, value: String },
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("Field appears more than once: {0}")]
    DuplicateField(&'static str),
    #[error("Invalid rule id: {0}")]
    InvalidId(#[from] RuleIdError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Id,
    Version,
    LastUpdated,
    TokenBudget,
    ContextTier,
    Keywords,
    DependsOn,
    Related(RelationKind),
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "ruleid" | "id" => Field::Id,
            "version" => Field::Version,
            "lastupdated" | "updated" => Field::LastUpdated,
            "tokenbudget" | "tokens" => Field::TokenBudget,
            "contexttier" | "tier" => Field::ContextTier,
            "keywords" => Field::Keywords,
            "depends" | "dependson" | "dependencies" => Field::DependsOn,
            "closelyrelated" => Field::Related(RelationKind::Closely),
            "sometimesrelated" => Field::Related(RelationKind::Sometimes),
            "complementary" | "complementaryrules" => Field::Related(RelationKind::Complementary),
            _ => return None,
        };
        Some(field)
    }

    fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Version => "version",
            Field::LastUpdated => "lastUpdated",
            Field::TokenBudget => "tokenBudget",
            Field::ContextTier => "contextTier",
            Field::Keywords => "keywords",
            Field::DependsOn => "dependsOn",
            Field::Related(RelationKind::Closely) => "closelyRelated",
            Field::Related(RelationKind::Sometimes) => "sometimesRelated",
            Field::Related(RelationKind::Complementary) => "complementary",
        }
    }
}

/// Parse a rule from raw text. The header must carry its own id.
pub fn parse(text: &str) -> Result<RuleRecord, ParseError> {
    parse_with(text, ContentHash::from_content(text.as_bytes()), None, IdFallback::Disabled)
}

/// Parse an ingested document, falling back to its source file stem for the
/// id when `fallback` allows it.
pub fn parse_document(doc: &RuleDocument, fallback: IdFallback) -> Result<RuleRecord, ParseError> {
    parse_with(&doc.content, doc.hash.clone(), Some(doc.source.as_str()), fallback)
}

fn parse_with(
    text: &str,
    content_hash: ContentHash,
    source: Option<&str>,
    fallback: IdFallback,
) -> Result<RuleRecord, ParseError> {
    let split = header::split(text);

    let mut seen: BTreeSet<Field> = BTreeSet::new();
    let mut id = None;
    let mut version = None;
    let mut last_updated = None;
    let mut token_budget = None;
    let mut context_tier = ContextTier::default();
    let mut keywords = BTreeSet::new();
    let mut depends_on: Vec<RuleId> = Vec::new();
    let mut related = Vec::new();
    let mut extra = Metadata::new();

    for line in &split.header {
        let Some(FieldLine { key, label, value }) = header::parse_field(line) else {
            continue;
        };

        let Some(field) = Field::from_key(&key) else {
            extra.insert(label, MetadataValue::from_raw(value));
            continue;
        };

        if !seen.insert(field) {
            return Err(ParseError::DuplicateField(field.name()));
        }

        match field {
            Field::Id => id = Some(RuleId::parse(value)?),
            Field::Version => {
                if !value.is_empty() {
                    version = Some(value.to_string());
                }
            }
            Field::LastUpdated => {
                let date = normalize::date(value).ok_or_else(|| invalid(field, value))?;
                last_updated = Some(date);
            }
            Field::TokenBudget => {
                let budget = normalize::token_budget(value)
                    .filter(|budget| *budget > 0)
                    .ok_or_else(|| invalid(field, value))?;
                token_budget = Some(budget);
            }
            Field::ContextTier => {
                context_tier = ContextTier::parse(value).ok_or_else(|| invalid(field, value))?;
            }
            Field::Keywords => keywords.extend(normalize::keyword_list(value)),
            Field::DependsOn => {
                if normalize::is_empty_list(value) {
                    continue;
                }
                for entry in normalize::id_list(value) {
                    let dep = RuleId::parse(entry).map_err(|_| ParseError::MalformedDependency {
                        field: field.name(),
                        value: value.to_string(),
                    })?;
                    if !depends_on.contains(&dep) {
                        depends_on.push(dep);
                    }
                }
            }
            Field::Related(kind) => {
                if normalize::is_empty_list(value) {
                    continue;
                }
                // Soft links: unusable entries are dropped, not fatal
                for entry in normalize::id_list(value) {
                    if let Ok(target) = RuleId::parse(entry) {
                        related.push(Relation { kind, target });
                    }
                }
            }
        }
    }

    let id = match (id, fallback, source) {
        (Some(id), _, _) => id,
        (None, IdFallback::FileStem, Some(source)) => RuleId::from_source(Path::new(source))?,
        _ => return Err(ParseError::MissingField("id")),
    };
    let token_budget = token_budget.ok_or(ParseError::MissingField("tokenBudget"))?;

    Ok(RuleRecord {
        id,
        version,
        last_updated,
        token_budget,
        context_tier,
        keywords,
        depends_on,
        related,
        extra,
        body: split.body.to_string(),
        content_hash,
        source: source.map(str::to_string),
    })
}

fn invalid(field: Field, value: &str) -> ParseError {
    ParseError::InvalidValue {
        field: field.name(),
        value: value.to_string(),
    }
}
