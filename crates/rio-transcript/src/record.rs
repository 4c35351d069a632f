use serde::Serialize;
use serde_json::Value;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// A tool invocation found in an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUse {
    pub tool: String,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn record_type(record: &Value) -> Option<&str> {
    record.get("type")?.as_str()
}

fn is_user_message(record: &Value) -> bool {
    record_type(record) == Some("user")
        && record.pointer("/message/role").and_then(Value::as_str) == Some("user")
}

fn content_parts(record: &Value) -> impl Iterator<Item = &Value> {
    record
        .pointer("/message/content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn has_part_type(part: &Value, kind: &str) -> bool {
    part.get("type").and_then(Value::as_str) == Some(kind)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// User text segments carry their text under `text`; older hosts used `content`.
fn user_segment_text(part: &Value) -> Option<&str> {
    non_empty_str(part.get("text")).or_else(|| non_empty_str(part.get("content")))
}

/// Project a raw record onto a conversation turn.
///
/// Returns `None` for summaries, non-conversational records, and turns whose
/// textual content is empty.
pub(crate) fn conversation_turn(record: &Value) -> Option<ConversationTurn> {
    match record_type(record)? {
        "user" if is_user_message(record) => {
            let content = match record.pointer("/message/content")? {
                Value::String(text) => text.clone(),
                Value::Array(parts) => parts
                    .iter()
                    .filter(|p| has_part_type(p, "text"))
                    .filter_map(user_segment_text)
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => return None,
            };
            (!content.is_empty()).then_some(ConversationTurn {
                role: Role::User,
                content,
            })
        }
        "assistant" => {
            let content: String = content_parts(record)
                .filter(|p| has_part_type(p, "text"))
                .filter_map(|p| non_empty_str(p.get("text")))
                .collect();
            (!content.is_empty()).then_some(ConversationTurn {
                role: Role::Assistant,
                content,
            })
        }
        _ => None,
    }
}

/// Extract every named tool invocation with a non-null input from an assistant record.
pub(crate) fn tool_uses(record: &Value) -> Vec<ToolUse> {
    if record_type(record) != Some("assistant") {
        return Vec::new();
    }
    let timestamp = record
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_owned);

    content_parts(record)
        .filter(|p| has_part_type(p, "tool_use"))
        .filter_map(|p| {
            let tool = non_empty_str(p.get("name"))?;
            let input = p.get("input").filter(|v| !v.is_null())?;
            Some(ToolUse {
                tool: tool.to_owned(),
                input: input.clone(),
                timestamp: timestamp.clone(),
            })
        })
        .collect()
}

/// The string content of a user message, if the record is one.
pub(crate) fn user_text(record: &Value) -> Option<&str> {
    if !is_user_message(record) {
        return None;
    }
    record.pointer("/message/content")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_string_content() {
        let record = json!({"type": "user", "message": {"role": "user", "content": "hello"}});
        assert_eq!(
            conversation_turn(&record),
            Some(ConversationTurn {
                role: Role::User,
                content: "hello".into()
            })
        );
    }

    #[test]
    fn user_segments_joined_with_newline() {
        let record = json!({
            "type": "user",
            "message": {"role": "user", "content": [
                {"type": "text", "text": "first"},
                {"type": "tool_result", "content": "ignored"},
                {"type": "text", "content": "second"}
            ]}
        });
        let turn = conversation_turn(&record).unwrap();
        assert_eq!(turn.content, "first\nsecond");
    }

    #[test]
    fn user_tool_result_only_is_omitted() {
        let record = json!({
            "type": "user",
            "message": {"role": "user", "content": [{"type": "tool_result", "content": "x"}]}
        });
        assert!(conversation_turn(&record).is_none());
    }

    #[test]
    fn assistant_segments_concatenated() {
        let record = json!({
            "type": "assistant",
            "message": {"role": "assistant", "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "name": "Read", "input": {}},
                {"type": "text", "text": "world"}
            ]}
        });
        let turn = conversation_turn(&record).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "Hello, world");
    }

    #[test]
    fn assistant_with_string_content_is_omitted() {
        let record = json!({"type": "assistant", "message": {"content": "plain"}});
        assert!(conversation_turn(&record).is_none());
    }

    #[test]
    fn summary_is_skipped() {
        let record = json!({"type": "summary", "summary": "Earlier work"});
        assert!(conversation_turn(&record).is_none());
    }

    #[test]
    fn tool_uses_require_name_and_input() {
        let record = json!({
            "type": "assistant",
            "timestamp": "2025-01-01T00:00:00Z",
            "message": {"content": [
                {"type": "tool_use", "name": "Bash", "input": {"command": "ls"}},
                {"type": "tool_use", "name": "Edit"},
                {"type": "tool_use", "input": {"x": 1}},
                {"type": "text", "text": "done"}
            ]}
        });
        let uses = tool_uses(&record);
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].tool, "Bash");
        assert_eq!(uses[0].input, json!({"command": "ls"}));
        assert_eq!(uses[0].timestamp.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn tool_uses_ignore_user_records() {
        let record = json!({
            "type": "user",
            "message": {"role": "user", "content": [{"type": "tool_use", "name": "Bash", "input": {}}]}
        });
        assert!(tool_uses(&record).is_empty());
    }

    #[test]
    fn user_text_requires_string_content() {
        let text = json!({"type": "user", "message": {"role": "user", "content": "start"}});
        let parts = json!({"type": "user", "message": {"role": "user", "content": []}});
        assert_eq!(user_text(&text), Some("start"));
        assert_eq!(user_text(&parts), None);
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
