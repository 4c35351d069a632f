//! Matcher units: contract validation, loading, relevance scoring, and directive rendering.

pub mod category;
pub mod command;
pub mod context;
pub mod contract;
pub mod directive;
pub mod error;
pub mod keyword;
pub mod loader;
pub mod matcher;
pub mod payload;
pub mod scorer;

pub use category::Category;
pub use context::{MatcherContext, MatcherMeta, TranscriptView};
pub use contract::{
    ContractError, MatcherResult, SCHEMA_VERSION, validate_matcher_module, validate_matcher_result,
};
pub use directive::format_directive;
pub use error::LoadError;
pub use loader::{MatcherDescriptor, MatcherExport, MatcherLoader, build_descriptors};
pub use matcher::{Matcher, MatcherFuture, from_fn};
pub use payload::{HookPayload, PayloadError, validate_payload};
pub use scorer::{ActiveItem, MATCH_COUNT_CAP, Ranking, rank};
