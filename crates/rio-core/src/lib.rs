//! Hook runtime: configuration, the append-only hook log, matcher execution,
//! and the evaluation pipeline.

pub mod config;
pub mod error;
pub mod log;
pub mod output;
pub mod pipeline;
pub mod runner;

pub use config::{Config, resolve_config_path};
pub use error::{HookError, LogError, MatcherError};
pub use log::{HookEvent, HookLog};
pub use output::HookOutput;
pub use pipeline::{Pipeline, parse_input};
pub use runner::{MatcherRunner, invoke};
