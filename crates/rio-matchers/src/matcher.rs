use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::context::MatcherContext;

/// Boxed matcher outcome. The value is the raw, not yet validated result object.
pub type MatcherFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// A relevance matcher for one skill, agent, or command.
///
/// Synchronous matchers return a ready future; the executor awaits every
/// matcher the same way and never runs two at once.
pub trait Matcher: Send + Sync {
    fn evaluate<'a>(&'a self, ctx: &'a MatcherContext) -> MatcherFuture<'a>;
}

struct FnMatcher<F>(F);

impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&MatcherContext) -> anyhow::Result<Value> + Send + Sync,
{
    fn evaluate<'a>(&'a self, ctx: &'a MatcherContext) -> MatcherFuture<'a> {
        Box::pin(async move { (self.0)(ctx) })
    }
}

/// Wrap a synchronous function as a matcher for explicit registration.
pub fn from_fn<F>(f: F) -> Arc<dyn Matcher>
where
    F: Fn(&MatcherContext) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnMatcher(f))
}
