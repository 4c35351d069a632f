use rio_transcript::{ConversationTurn, ToolUse, Transcript};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::SCHEMA_VERSION;
use crate::payload::HookPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherMeta {
    pub schema_version: &'static str,
}

impl Default for MatcherMeta {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// Transcript views a command matcher may ask to receive on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptView {
    Messages,
    History,
    ToolUsage,
    InitialMessage,
}

impl TranscriptView {
    pub const ALL: [Self; 4] = [
        Self::Messages,
        Self::History,
        Self::ToolUsage,
        Self::InitialMessage,
    ];
}

/// Read-only input handed to every matcher of one evaluation.
///
/// Owns the transcript accessor, so its memoized views live exactly as long as
/// the evaluation that created the context.
#[derive(Debug)]
pub struct MatcherContext {
    pub payload: HookPayload,
    pub meta: MatcherMeta,
    transcript: Transcript,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextEnvelope<'a> {
    prompt: &'a str,
    cwd: &'a str,
    session_id: &'a str,
    transcript_path: &'a str,
    permission_mode: &'a str,
    hook_event_name: &'a str,
    meta: MatcherMeta,
    #[serde(skip_serializing_if = "TranscriptViews::is_empty")]
    transcript: TranscriptViews<'a>,
}

#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptViews<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [ConversationTurn]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_usage: Option<&'a [ToolUse]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_message: Option<Option<&'a str>>,
}

impl TranscriptViews<'_> {
    fn is_empty(&self) -> bool {
        self.messages.is_none()
            && self.history.is_none()
            && self.tool_usage.is_none()
            && self.initial_message.is_none()
    }
}

impl MatcherContext {
    #[must_use]
    pub fn new(payload: HookPayload) -> Self {
        let transcript = Transcript::new(&payload.transcript_path);
        Self {
            payload,
            meta: MatcherMeta::default(),
            transcript,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.payload.prompt
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Serialize the context for an out-of-process matcher, including the
    /// requested transcript views.
    ///
    /// # Errors
    ///
    /// Returns an error if a transcript record cannot be serialized.
    pub async fn to_json(&self, views: &[TranscriptView]) -> serde_json::Result<Value> {
        let mut transcript = TranscriptViews::default();
        for view in views {
            match view {
                TranscriptView::Messages => {
                    transcript.messages = Some(self.transcript.all_messages().await);
                }
                TranscriptView::History => {
                    transcript.history = Some(self.transcript.conversation_history().await);
                }
                TranscriptView::ToolUsage => {
                    transcript.tool_usage = Some(self.transcript.tool_usage().await);
                }
                TranscriptView::InitialMessage => {
                    transcript.initial_message = Some(self.transcript.initial_message().await);
                }
            }
        }

        let envelope = ContextEnvelope {
            prompt: &self.payload.prompt,
            cwd: &self.payload.cwd,
            session_id: &self.payload.session_id,
            transcript_path: &self.payload.transcript_path,
            permission_mode: &self.payload.permission_mode,
            hook_event_name: &self.payload.hook_event_name,
            meta: self.meta,
            transcript,
        };
        serde_json::to_value(envelope)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn payload(prompt: &str, transcript_path: &str) -> HookPayload {
        HookPayload {
            prompt: prompt.into(),
            cwd: "/work".into(),
            session_id: "s-1".into(),
            transcript_path: transcript_path.into(),
            permission_mode: "default".into(),
            hook_event_name: "UserPromptSubmit".into(),
        }
    }

    #[test]
    fn meta_carries_schema_version() {
        let ctx = MatcherContext::new(payload("hi", "/nonexistent"));
        assert_eq!(ctx.meta.schema_version, "2.0");
        assert_eq!(ctx.prompt(), "hi");
    }

    #[tokio::test]
    async fn json_without_views_omits_transcript() {
        let ctx = MatcherContext::new(payload("hi", "/nonexistent"));
        let json = ctx.to_json(&[]).await.unwrap();
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["transcriptPath"], "/nonexistent");
        assert_eq!(json["hookEventName"], "UserPromptSubmit");
        assert_eq!(json["meta"]["schemaVersion"], "2.0");
        assert!(json.get("transcript").is_none());
    }

    #[tokio::test]
    async fn json_includes_requested_views() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type":"user","message":{{"role":"user","content":"first"}}}}"#
        )
        .unwrap();
        let ctx = MatcherContext::new(payload("hi", file.path().to_str().unwrap()));

        let json = ctx
            .to_json(&[TranscriptView::History, TranscriptView::InitialMessage])
            .await
            .unwrap();
        assert_eq!(json["transcript"]["history"][0]["role"], "user");
        assert_eq!(json["transcript"]["history"][0]["content"], "first");
        assert_eq!(json["transcript"]["initialMessage"], "first");
        assert!(json["transcript"].get("messages").is_none());
    }

    #[tokio::test]
    async fn missing_initial_message_serializes_as_null() {
        let ctx = MatcherContext::new(payload("hi", "/nonexistent"));
        let json = ctx.to_json(&[TranscriptView::InitialMessage]).await.unwrap();
        assert!(json["transcript"]["initialMessage"].is_null());
        assert!(json["transcript"].get("initialMessage").is_some());
    }

    #[tokio::test]
    async fn json_includes_every_view() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type":"user","message":{{"role":"user","content":"first"}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"type":"assistant","timestamp":"2025-01-01T00:00:00Z","message":{{"role":"assistant","content":[{{"type":"tool_use","name":"Read","input":{{"file_path":"/a"}}}}]}}}}"#
        )
        .unwrap();
        let ctx = MatcherContext::new(payload("hi", file.path().to_str().unwrap()));

        let json = ctx.to_json(&TranscriptView::ALL).await.unwrap();
        let transcript = &json["transcript"];
        assert_eq!(transcript["messages"].as_array().unwrap().len(), 2);
        assert_eq!(transcript["history"][0]["content"], "first");
        assert_eq!(transcript["toolUsage"][0]["tool"], "Read");
        assert_eq!(transcript["initialMessage"], "first");
    }

    #[test]
    fn views_deserialize_from_snake_case() {
        #[derive(Deserialize)]
        struct Holder {
            views: Vec<TranscriptView>,
        }
        let holder: Holder =
            toml::from_str(r#"views = ["messages", "history", "tool_usage", "initial_message"]"#)
                .unwrap();
        assert_eq!(
            holder.views,
            vec![
                TranscriptView::Messages,
                TranscriptView::History,
                TranscriptView::ToolUsage,
                TranscriptView::InitialMessage
            ]
        );
    }
}
