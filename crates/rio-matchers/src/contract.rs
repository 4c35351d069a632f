use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::category::Category;
use crate::command::{CommandMatcher, CommandSpec};
use crate::context::TranscriptView;
use crate::keyword::{KeywordMatcher, KeywordSpec};
use crate::loader::MatcherExport;
use crate::matcher::Matcher;

/// Result schema version every matcher must declare.
pub const SCHEMA_VERSION: &str = "2.0";

/// Largest integer a matcher may report (`2^53 - 1`).
pub const MAX_SAFE_MATCH_COUNT: u64 = 9_007_199_254_740_991;

/// Name of the manifest table holding the callable member.
const MEMBER_KEY: &str = "match";

/// A matcher result that passed [`validate_matcher_result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherResult {
    pub version: String,
    pub match_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("matcher result must be an object (got type: {found})")]
    NotAnObject { found: &'static str },

    #[error("matcher result must have a \"version\" field (cannot be missing or null)")]
    MissingVersion,

    #[error("matcher result \"version\" must be a string (got type: {found})")]
    VersionNotString { found: &'static str },

    #[error("matcher result \"version\" must be a non-empty string")]
    EmptyVersion,

    #[error(
        "matcher result \"version\" must be \"{expected}\" (got: {found}); v1.0 matchers need migration to the {expected} result schema"
    )]
    UnsupportedVersion {
        expected: &'static str,
        found: String,
    },

    #[error("matcher result must have a \"matchCount\" field (cannot be missing or null)")]
    MissingMatchCount,

    #[error("matcher result \"matchCount\" must be a number (got type: {found})")]
    MatchCountNotNumber { found: &'static str },

    #[error("matcher result \"matchCount\" must be an integer (got: {found})")]
    MatchCountNotInteger { found: String },

    #[error("matcher result \"matchCount\" must be non-negative (got: {found})")]
    NegativeMatchCount { found: String },

    #[error("matcher result \"matchCount\" exceeds the largest safe integer (got: {found})")]
    MatchCountUnsafe { found: String },

    #[error("matcher result \"{key}\" must be one of: skill, agent, command (got: {found})")]
    InvalidCategory { key: &'static str, found: String },

    #[error("matcher must export a command or a `match` member")]
    InvalidModule,

    #[error("invalid matcher manifest: {reason}")]
    InvalidManifest { reason: String },
}

/// JSON type name used in contract error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn present<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn match_count(raw: &Value) -> Result<u64, ContractError> {
    let Value::Number(number) = raw else {
        return Err(ContractError::MatchCountNotNumber {
            found: json_type_name(raw),
        });
    };

    if let Some(n) = number.as_u64() {
        if n > MAX_SAFE_MATCH_COUNT {
            return Err(ContractError::MatchCountUnsafe {
                found: number.to_string(),
            });
        }
        return Ok(n);
    }
    if number.is_i64() {
        return Err(ContractError::NegativeMatchCount {
            found: number.to_string(),
        });
    }

    // Floats are accepted only when they hold an exact integer.
    let f = number.as_f64().unwrap_or(f64::NAN);
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(ContractError::MatchCountNotInteger {
            found: number.to_string(),
        });
    }
    if f < 0.0 {
        return Err(ContractError::NegativeMatchCount {
            found: number.to_string(),
        });
    }
    #[allow(clippy::cast_precision_loss)]
    let limit = MAX_SAFE_MATCH_COUNT as f64;
    if f > limit {
        return Err(ContractError::MatchCountUnsafe {
            found: number.to_string(),
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = f as u64;
    Ok(count)
}

fn category(object: &serde_json::Map<String, Value>) -> Result<Option<Category>, ContractError> {
    let (key, raw) = match (present(object, "category"), present(object, "type")) {
        (Some(raw), _) => ("category", raw),
        (None, Some(raw)) => ("type", raw),
        (None, None) => return Ok(None),
    };

    raw.as_str()
        .and_then(Category::parse)
        .map(Some)
        .ok_or_else(|| ContractError::InvalidCategory {
            key,
            found: raw.as_str().map_or_else(|| raw.to_string(), str::to_owned),
        })
}

/// Validate the raw value a matcher returned.
///
/// Checks run in a fixed order and the first failure is returned: shape,
/// `version`, `matchCount`, then the optional `category` (or legacy `type`).
///
/// # Errors
///
/// Returns the [`ContractError`] describing the first violation.
pub fn validate_matcher_result(raw: &Value) -> Result<MatcherResult, ContractError> {
    let Value::Object(object) = raw else {
        return Err(ContractError::NotAnObject {
            found: json_type_name(raw),
        });
    };

    let version = match present(object, "version") {
        None => return Err(ContractError::MissingVersion),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(ContractError::VersionNotString {
                found: json_type_name(other),
            });
        }
    };
    if version.trim().is_empty() {
        return Err(ContractError::EmptyVersion);
    }
    if version != SCHEMA_VERSION {
        return Err(ContractError::UnsupportedVersion {
            expected: SCHEMA_VERSION,
            found: version.clone(),
        });
    }

    let raw_count = present(object, "matchCount").ok_or(ContractError::MissingMatchCount)?;
    let match_count = match_count(raw_count)?;

    Ok(MatcherResult {
        version: version.clone(),
        match_count,
        category: category(object)?,
    })
}

fn invalid_manifest(err: impl std::fmt::Display) -> ContractError {
    ContractError::InvalidManifest {
        reason: err.to_string(),
    }
}

/// Adapt a loaded export into the single invocation shape.
///
/// Executables and manifests with a top-level `command` are directly callable.
/// A bare executable receives every transcript view on stdin.
/// Otherwise the manifest must carry a `[match]` member holding either a
/// `command` or a `keywords`/`patterns` rule set.
///
/// # Errors
///
/// Returns [`ContractError::InvalidModule`] when no callable form is present and
/// [`ContractError::InvalidManifest`] when the callable form is malformed.
pub fn validate_matcher_module(export: MatcherExport) -> Result<Arc<dyn Matcher>, ContractError> {
    match export {
        MatcherExport::Callable(matcher) => Ok(matcher),
        MatcherExport::Executable(path) => Ok(Arc::new(
            CommandMatcher::new(path).with_views(TranscriptView::ALL.to_vec()),
        )),
        MatcherExport::Manifest { path, mut table } => {
            let base = path.parent().unwrap_or(std::path::Path::new("."));

            if table.contains_key("command") {
                let spec: CommandSpec = toml::Value::Table(table)
                    .try_into()
                    .map_err(invalid_manifest)?;
                return Ok(Arc::new(spec.into_matcher(base)));
            }

            let Some(member) = table.remove(MEMBER_KEY) else {
                return Err(ContractError::InvalidModule);
            };
            let toml::Value::Table(member) = member else {
                return Err(ContractError::InvalidModule);
            };

            if member.contains_key("command") {
                let spec: CommandSpec = toml::Value::Table(member)
                    .try_into()
                    .map_err(invalid_manifest)?;
                Ok(Arc::new(spec.into_matcher(base)))
            } else if member.contains_key("keywords") || member.contains_key("patterns") {
                let spec: KeywordSpec = toml::Value::Table(member)
                    .try_into()
                    .map_err(invalid_manifest)?;
                let matcher = KeywordMatcher::from_spec(spec).map_err(invalid_manifest)?;
                Ok(Arc::new(matcher))
            } else {
                Err(ContractError::InvalidModule)
            }
        }
    }
}
