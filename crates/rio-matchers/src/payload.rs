use serde::Serialize;
use serde_json::Value;

/// Fields every `UserPromptSubmit` payload must carry, in validation order.
pub const PAYLOAD_FIELDS: [&str; 6] = [
    "prompt",
    "cwd",
    "session_id",
    "transcript_path",
    "permission_mode",
    "hook_event_name",
];

/// Validated hook input read from stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookPayload {
    pub prompt: String,
    pub cwd: String,
    pub session_id: String,
    pub transcript_path: String,
    pub permission_mode: String,
    pub hook_event_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload must be a non-empty object")]
    NotAnObject,

    #[error("field \"{field}\" must be a non-empty string")]
    InvalidField { field: &'static str },
}

fn required_string(
    object: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, PayloadError> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(PayloadError::InvalidField { field }),
    }
}

/// Validate the raw stdin payload.
///
/// Fields are checked in [`PAYLOAD_FIELDS`] order and the first violation is returned.
///
/// # Errors
///
/// Returns [`PayloadError`] when the payload is not an object or a field is
/// missing, not a string, or blank.
pub fn validate_payload(raw: &Value) -> Result<HookPayload, PayloadError> {
    let Value::Object(object) = raw else {
        return Err(PayloadError::NotAnObject);
    };

    let [prompt, cwd, session_id, transcript_path, permission_mode, hook_event_name] =
        PAYLOAD_FIELDS;

    Ok(HookPayload {
        prompt: required_string(object, prompt)?,
        cwd: required_string(object, cwd)?,
        session_id: required_string(object, session_id)?,
        transcript_path: required_string(object, transcript_path)?,
        permission_mode: required_string(object, permission_mode)?,
        hook_event_name: required_string(object, hook_event_name)?,
    })
}
