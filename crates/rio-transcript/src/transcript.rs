use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::OnceCell;

use crate::record::{ConversationTurn, ToolUse, conversation_turn, tool_uses, user_text};

/// Memoized views over one transcript file.
///
/// Every view is computed on first request and cached for the lifetime of the
/// value. Create one per evaluation; the cache is never shared across turns.
/// A missing or unreadable file behaves like an empty transcript.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    messages: OnceCell<Vec<Value>>,
    history: OnceCell<Vec<ConversationTurn>>,
    tool_usage: OnceCell<Vec<ToolUse>>,
    initial_message: OnceCell<Option<String>>,
}

impl Transcript {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            messages: OnceCell::new(),
            history: OnceCell::new(),
            tool_usage: OnceCell::new(),
            initial_message: OnceCell::new(),
        }
    }

    /// All parsed records in file order, including non-conversational ones.
    pub async fn all_messages(&self) -> &[Value] {
        self.messages
            .get_or_init(|| read_records(&self.path))
            .await
    }

    /// User and assistant turns with non-empty textual content.
    pub async fn conversation_history(&self) -> &[ConversationTurn] {
        self.history
            .get_or_init(|| async {
                self.all_messages()
                    .await
                    .iter()
                    .filter_map(conversation_turn)
                    .collect()
            })
            .await
    }

    /// Tool invocations from assistant turns, in encounter order.
    pub async fn tool_usage(&self) -> &[ToolUse] {
        self.tool_usage
            .get_or_init(|| async {
                self.all_messages()
                    .await
                    .iter()
                    .flat_map(tool_uses)
                    .collect()
            })
            .await
    }

    /// String content of the first user message.
    ///
    /// Reuses the cached records when they are already loaded, otherwise stops
    /// reading the file at the first match.
    pub async fn initial_message(&self) -> Option<&str> {
        self.initial_message
            .get_or_init(|| async {
                if let Some(messages) = self.messages.get() {
                    return messages
                        .iter()
                        .find_map(user_text)
                        .map(str::to_owned);
                }
                scan_initial_message(&self.path).await
            })
            .await
            .as_deref()
    }
}

fn parse_line(line: &[u8]) -> Option<Value> {
    let Ok(line) = std::str::from_utf8(line) else {
        tracing::debug!("skipping non-utf8 transcript line");
        return None;
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("skipping malformed transcript line: {e}");
            None
        }
    }
}

async fn open_lines(path: &Path) -> Option<tokio::io::Split<BufReader<tokio::fs::File>>> {
    match tokio::fs::File::open(path).await {
        Ok(file) => Some(BufReader::new(file).split(b'\n')),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("transcript not found: {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("cannot open transcript {}: {e}", path.display());
            None
        }
    }
}

async fn read_records(path: &Path) -> Vec<Value> {
    let mut records = Vec::new();
    let Some(mut lines) = open_lines(path).await else {
        return records;
    };

    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => records.extend(parse_line(&line)),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("transcript read interrupted at {}: {e}", path.display());
                break;
            }
        }
    }

    tracing::debug!(count = records.len(), "transcript records loaded");
    records
}

async fn scan_initial_message(path: &Path) -> Option<String> {
    let mut lines = open_lines(path).await?;

    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                if let Some(text) = parse_line(&line).as_ref().and_then(user_text) {
                    return Some(text.to_owned());
                }
            }
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("transcript read interrupted at {}: {e}", path.display());
                return None;
            }
        }
    }
}
