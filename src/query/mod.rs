//! Search query data model and parsing
//!
//! A [`Query`] is the immutable input to one search session. [`Query::parse`]
//! additionally handles the `@provider` filter syntax, e.g. `@files report`
//! restricts the session to providers matching `files`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable input to one search session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// The search text
    pub text: String,
    /// Caller-supplied context passed through to providers
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    /// Skip the fallback tier entirely.
    ///
    /// Used for latency-critical live-typing searches; an explicit
    /// "search more" request leaves this unset.
    #[serde(default)]
    pub skip_fallback: bool,
    /// Restrict the session to providers whose id matches this filter
    #[serde(default)]
    pub provider_filter: Option<String>,
}

impl Query {
    /// Create a new query for the given text, taken literally
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: HashMap::new(),
            skip_fallback: false,
            provider_filter: None,
        }
    }

    /// Parse raw user input, extracting a leading `@provider` filter.
    ///
    /// `@files report` becomes text `report` filtered to providers matching
    /// `files`; input without the prefix is taken literally.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (provider_filter, text) = split_provider_filter(&raw);
        Self {
            text,
            context: HashMap::new(),
            skip_fallback: false,
            provider_filter,
        }
    }

    /// Attach a context value
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Restrict the session to the default tier
    pub fn skip_fallback(mut self) -> Self {
        self.skip_fallback = true;
        self
    }

    /// Restrict the session to providers matching the given filter
    pub fn with_provider_filter(mut self, filter: impl Into<String>) -> Self {
        self.provider_filter = Some(filter.into().to_lowercase());
        self
    }

    /// Whether a provider id passes this query's filter.
    ///
    /// Matches on exact id or substring, case-insensitive; a query without a
    /// filter matches every provider.
    pub fn matches_provider(&self, provider_id: &str) -> bool {
        match &self.provider_filter {
            Some(filter) => provider_id.to_lowercase().contains(filter.as_str()),
            None => true,
        }
    }

    /// Check if the query text is empty
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split a leading `@provider` token off the raw input.
fn split_provider_filter(raw: &str) -> (Option<String>, String) {
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix('@') {
        let filter: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !filter.is_empty() {
            let text = rest[filter.len()..].trim().to_string();
            return (Some(filter.to_lowercase()), text);
        }
    }
    (None, raw.to_string())
}
