use std::path::PathBuf;

use rio_matchers::{
    HookPayload, MatcherContext, MatcherLoader, Ranking, build_descriptors, format_directive,
    rank, validate_payload,
};
use serde_json::Value;

use crate::error::{HookError, LogError};
use crate::log::{HookEvent, HookLog, OutputItem, ScoredName};
use crate::output::HookOutput;
use crate::runner::MatcherRunner;

/// Parse hook input. Blank input is read as an empty object.
///
/// # Errors
///
/// Returns [`HookError::Input`] if the input is not valid JSON.
pub fn parse_input(input: &str) -> Result<Value, HookError> {
    if input.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(input).map_err(HookError::Input)
}

/// One evaluation of the installed matchers against a prompt.
pub struct Pipeline<'a> {
    paths: &'a [PathBuf],
    loader: &'a MatcherLoader,
    log: &'a HookLog,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(paths: &'a [PathBuf], loader: &'a MatcherLoader, log: &'a HookLog) -> Self {
        Self { paths, loader, log }
    }

    /// Validate raw hook input and evaluate it.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] if the input is not JSON, the payload is invalid,
    /// or the hook log cannot be written.
    pub async fn run(&self, input: &str) -> Result<Option<HookOutput>, HookError> {
        let raw = parse_input(input)?;
        let payload = validate_payload(&raw)?;
        Ok(self.evaluate(payload).await?)
    }

    /// Evaluate a validated payload.
    ///
    /// Returns `None` when no matcher reported a match.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] if the hook log cannot be written.
    pub async fn evaluate(&self, payload: HookPayload) -> Result<Option<HookOutput>, LogError> {
        self.log.record(&HookEvent::Payload { payload: &payload }).await?;

        let descriptors = build_descriptors(self.paths);
        self.log
            .record(&HookEvent::MatchersDiscovered {
                count: descriptors.len(),
                matchers: &descriptors,
            })
            .await?;
        tracing::debug!("discovered {} matchers", descriptors.len());

        // The transcript cache lives exactly as long as this context.
        let ctx = MatcherContext::new(payload);
        let active = MatcherRunner::new(self.loader, self.log)
            .run(&descriptors, &ctx)
            .await?;

        let ranking = rank(active);
        if !ranking.is_empty() {
            self.log_scores(&ranking).await?;
        }
        self.log
            .record(&HookEvent::ItemsEvaluated {
                active_items: &ranking.items,
            })
            .await?;

        if ranking.is_empty() {
            return Ok(None);
        }

        let output = HookOutput::new(format_directive(&ranking.items));
        self.log
            .record(&HookEvent::OutputGenerated {
                item_count: ranking.items.len(),
                items: ranking
                    .items
                    .iter()
                    .map(|i| OutputItem {
                        name: &i.name,
                        category: i.category,
                        score: i.score,
                    })
                    .collect(),
                output: &output,
            })
            .await?;
        Ok(Some(output))
    }

    async fn log_scores(&self, ranking: &Ranking) -> Result<(), LogError> {
        self.log
            .record(&HookEvent::ScoresCalculated {
                max_match_count: ranking.max_capped,
                items: ranking
                    .items
                    .iter()
                    .map(|i| ScoredName {
                        name: &i.name,
                        match_count: i.match_count,
                        score: i.score,
                    })
                    .collect(),
            })
            .await
    }
}
