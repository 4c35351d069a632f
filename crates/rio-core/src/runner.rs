use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use rio_matchers::{
    ActiveItem, Matcher, MatcherContext, MatcherDescriptor, MatcherLoader,
    validate_matcher_module, validate_matcher_result,
};
use serde_json::Value;

use crate::error::{LogError, MatcherError};
use crate::log::{HookEvent, HookLog};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

/// Invoke one matcher and wait for it to settle.
///
/// Both returned errors and panics, whether raised while building the future
/// or while polling it, come back as [`MatcherError`].
///
/// # Errors
///
/// Returns [`MatcherError`] if the matcher fails or panics.
pub async fn invoke(matcher: &dyn Matcher, ctx: &MatcherContext) -> Result<Value, MatcherError> {
    let outcome = AssertUnwindSafe(async { matcher.evaluate(ctx).await })
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(MatcherError::Failed(e)),
        Err(panic) => Err(MatcherError::Panicked(panic_message(&*panic))),
    }
}

/// Runs matcher units one at a time and collects those that matched.
pub struct MatcherRunner<'a> {
    loader: &'a MatcherLoader,
    log: &'a HookLog,
}

impl<'a> MatcherRunner<'a> {
    #[must_use]
    pub fn new(loader: &'a MatcherLoader, log: &'a HookLog) -> Self {
        Self { loader, log }
    }

    /// Evaluate every descriptor in order.
    ///
    /// A unit that fails to load, has no callable form, fails, panics, or
    /// returns an invalid result is logged and skipped. Items are returned in
    /// evaluation order, unscored.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] only when the hook log cannot be written.
    pub async fn run(
        &self,
        descriptors: &[MatcherDescriptor],
        ctx: &MatcherContext,
    ) -> Result<Vec<ActiveItem>, LogError> {
        let mut active = Vec::new();
        for descriptor in descriptors {
            if let Some(item) = self.run_one(descriptor, ctx).await? {
                active.push(item);
            }
        }
        Ok(active)
    }

    async fn run_one(
        &self,
        descriptor: &MatcherDescriptor,
        ctx: &MatcherContext,
    ) -> Result<Option<ActiveItem>, LogError> {
        let name = descriptor.name.as_str();
        let matcher_path = descriptor.path.as_path();

        let export = match self.loader.load(matcher_path).await {
            Ok(export) => export,
            Err(e) => {
                tracing::warn!("matcher {name} failed to load: {e}");
                self.log
                    .record(&HookEvent::MatcherLoadFailed {
                        name,
                        matcher_path,
                        error: e.to_string(),
                    })
                    .await?;
                return Ok(None);
            }
        };

        let matcher = match validate_matcher_module(export) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!("matcher {name} is invalid: {e}");
                self.log
                    .record(&HookEvent::MatcherInvalid {
                        name,
                        matcher_path,
                        error: e.to_string(),
                    })
                    .await?;
                return Ok(None);
            }
        };

        let raw = match invoke(matcher.as_ref(), ctx).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("matcher {name} failed: {e}");
                self.log
                    .record(&HookEvent::MatcherExecutionFailed {
                        name,
                        matcher_path,
                        error: e.to_string(),
                    })
                    .await?;
                return Ok(None);
            }
        };

        let result = match validate_matcher_result(&raw) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("matcher {name} returned an invalid result: {e}");
                self.log
                    .record(&HookEvent::MatcherResultInvalid {
                        name,
                        matcher_path,
                        error: e.to_string(),
                        returned_value: &raw,
                    })
                    .await?;
                return Ok(None);
            }
        };

        self.log
            .record(&HookEvent::MatcherExecuted {
                name,
                result: &result,
            })
            .await?;
        tracing::debug!("matcher {name} matched {} times", result.match_count);

        Ok((result.match_count > 0).then(|| {
            ActiveItem::new(
                name,
                result.match_count,
                result.category.unwrap_or(descriptor.category),
            )
        }))
    }
}
