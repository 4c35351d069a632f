use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::category::Category;
use crate::context::MatcherContext;
use crate::contract::SCHEMA_VERSION;
use crate::matcher::{Matcher, MatcherFuture};

/// Text a [`KeywordMatcher`] counts against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSource {
    /// The submitted prompt only.
    #[default]
    Prompt,
    /// The prompt plus every user turn of the conversation history.
    History,
}

/// `[match]` member of a declarative matcher manifest.
///
/// ```toml
/// [match]
/// keywords = ["login", "sign in"]
/// patterns = ["auth\\w*"]
/// source = "history"
/// category = "agent"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordSpec {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub source: KeywordSource,
    pub category: Option<Category>,
}

/// Counts how many distinct keywords and patterns occur in the prompt.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    source: KeywordSource,
    category: Option<Category>,
}

impl KeywordMatcher {
    /// Compile a manifest member. Blank keywords are dropped and duplicates
    /// count once.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid regular expression.
    pub fn from_spec(spec: KeywordSpec) -> Result<Self, regex::Error> {
        let mut keywords: Vec<String> = Vec::with_capacity(spec.keywords.len());
        for keyword in spec.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        let patterns = spec
            .patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keywords,
            patterns,
            source: spec.source,
            category: spec.category,
        })
    }

    /// Number of distinct keywords and patterns found in `text`.
    #[must_use]
    pub fn count(&self, text: &str) -> u64 {
        let haystack = text.to_lowercase();
        let keywords = self
            .keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count();
        let patterns = self.patterns.iter().filter(|p| p.is_match(text)).count();
        u64::try_from(keywords + patterns).unwrap_or(u64::MAX)
    }

    async fn haystack(&self, ctx: &MatcherContext) -> String {
        match self.source {
            KeywordSource::Prompt => ctx.prompt().to_owned(),
            KeywordSource::History => {
                let mut text = ctx.prompt().to_owned();
                for turn in ctx.transcript().conversation_history().await {
                    if turn.role == rio_transcript::Role::User {
                        text.push('\n');
                        text.push_str(&turn.content);
                    }
                }
                text
            }
        }
    }

    async fn run(&self, ctx: &MatcherContext) -> anyhow::Result<Value> {
        let count = self.count(&self.haystack(ctx).await);

        let mut result = Map::new();
        result.insert("version".into(), SCHEMA_VERSION.into());
        result.insert("matchCount".into(), count.into());
        if let Some(category) = self.category {
            result.insert("category".into(), category.as_str().into());
        }
        Ok(Value::Object(result))
    }
}

impl Matcher for KeywordMatcher {
    fn evaluate<'a>(&'a self, ctx: &'a MatcherContext) -> MatcherFuture<'a> {
        Box::pin(self.run(ctx))
    }
}
