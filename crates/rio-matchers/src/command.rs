use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::context::{MatcherContext, TranscriptView};
use crate::matcher::{Matcher, MatcherFuture};

/// Manifest form of a command matcher.
///
/// ```toml
/// command = "./match.sh"
/// args = ["--strict"]
/// transcript = ["history"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub transcript: Vec<TranscriptView>,
}

impl CommandSpec {
    /// Build the matcher. A relative program with a directory part is resolved
    /// against `base`; a bare name is looked up on `PATH`.
    #[must_use]
    pub fn into_matcher(self, base: &Path) -> CommandMatcher {
        let program = PathBuf::from(&self.command);
        let program = if program.is_relative() && program.components().count() > 1 {
            base.join(program)
        } else {
            program
        };
        CommandMatcher::new(program)
            .with_args(self.args)
            .with_views(self.transcript)
    }
}

/// Out-of-process matcher.
///
/// The serialized [`MatcherContext`] is written to the program's stdin and the
/// result object is read back from its stdout.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    program: PathBuf,
    args: Vec<String>,
    views: Vec<TranscriptView>,
}

impl CommandMatcher {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            views: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_views(mut self, views: Vec<TranscriptView>) -> Self {
        self.views = views;
        self
    }

    #[cfg(all(test, unix))]
    fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, ctx: &MatcherContext) -> anyhow::Result<Value> {
        let context = ctx
            .to_json(&self.views)
            .await
            .context("failed to serialize matcher context")?;
        let input = serde_json::to_vec(&context)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                // The program may exit without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("failed to wait for matcher process")?;
        fed.context("failed to write matcher input")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("matcher exited with {}: {}", output.status, stderr.trim());
        }

        let stdout = std::str::from_utf8(&output.stdout).context("matcher output is not UTF-8")?;
        serde_json::from_str(stdout.trim()).context("matcher output is not valid JSON")
    }
}

impl Matcher for CommandMatcher {
    fn evaluate<'a>(&'a self, ctx: &'a MatcherContext) -> MatcherFuture<'a> {
        Box::pin(self.run(ctx))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    use crate::context::tests::payload;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn reads_result_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(
            dir.path(),
            "m.sh",
            r#"cat >/dev/null; echo '{"version":"2.0","matchCount":3}'"#,
        );
        let ctx = MatcherContext::new(payload("x", "/nonexistent"));
        let value = CommandMatcher::new(path).evaluate(&ctx).await.unwrap();
        assert_eq!(value["matchCount"], 3);
    }

    #[tokio::test]
    async fn receives_context_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(
            dir.path(),
            "echo.sh",
            r#"input=$(cat); printf '{"echo":%s}' "$input""#,
        );
        let ctx = MatcherContext::new(payload("find the login form", "/nonexistent"));
        let value = CommandMatcher::new(path)
            .with_views(vec![TranscriptView::History])
            .evaluate(&ctx)
            .await
            .unwrap();
        assert_eq!(value["echo"]["prompt"], "find the login form");
        assert_eq!(value["echo"]["meta"]["schemaVersion"], "2.0");
        assert_eq!(value["echo"]["transcript"]["history"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(
            dir.path(),
            "args.sh",
            r#"cat >/dev/null; printf '{"version":"2.0","matchCount":%s}' "$1""#,
        );
        let ctx = MatcherContext::new(payload("x", "/nonexistent"));
        let value = CommandMatcher::new(path)
            .with_args(vec!["7".into()])
            .evaluate(&ctx)
            .await
            .unwrap();
        assert_eq!(value["matchCount"], 7);
    }

    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "fail.sh", "echo broken >&2; exit 3");
        let ctx = MatcherContext::new(payload("x", "/nonexistent"));
        let err = CommandMatcher::new(path).evaluate(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn non_json_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "text.sh", "echo hello");
        let ctx = MatcherContext::new(payload("x", "/nonexistent"));
        let err = CommandMatcher::new(path).evaluate(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn manifest_resolves_relative_program_against_base() {
        let spec: CommandSpec = toml::from_str("command = \"./m.sh\"").unwrap();
        let matcher = spec.into_matcher(Path::new("/skills/demo/rio"));
        assert_eq!(matcher.program(), Path::new("/skills/demo/rio/./m.sh"));

        let spec: CommandSpec = toml::from_str("command = \"python3\"").unwrap();
        assert_eq!(spec.into_matcher(Path::new("/x")).program(), Path::new("python3"));

        let spec: CommandSpec = toml::from_str("command = \"/usr/bin/m\"").unwrap();
        assert_eq!(spec.into_matcher(Path::new("/x")).program(), Path::new("/usr/bin/m"));
    }

    #[tokio::test]
    async fn missing_program_is_error() {
        let ctx = MatcherContext::new(payload("x", "/nonexistent"));
        let err = CommandMatcher::new("/nonexistent/matcher")
            .evaluate(&ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
