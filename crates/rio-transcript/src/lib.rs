//! Line-delimited conversation transcript reader.
//!
//! A [`Transcript`] is created once per hook evaluation and hands out lazily
//! computed, memoized views over the JSONL log written by the host.

pub mod record;
pub mod transcript;

pub use record::{ConversationTurn, Role, ToolUse};
pub use transcript::Transcript;
