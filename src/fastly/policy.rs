//! Cache-policy header writer.
//!
//! Decision table, first match wins:
//!
//! | Condition | Outcome |
//! |---|---|
//! | preview render | untouched |
//! | do-not-cache missing or empty | `private, no-store` |
//! | do-not-cache true | `private, no-store` |
//! | do-not-cache false, max-age <= 0 | untouched |
//! | do-not-cache false, max-age > 0 | edge cacheable |

use axum::http::{
    HeaderMap, HeaderName, HeaderValue,
    header::CACHE_CONTROL,
};
use metrics::counter;
use tracing::{debug, warn};

use super::keys;
use super::settings::{SettingsAccessor, parse_i64};
use crate::domain::content::{ContentCacheFlags, ContentItem};

pub const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");
pub const BACKEND_NAME_HEADER: HeaderName = HeaderName::from_static("x-backend-name");
/// Diagnostic value sent in `x-Backend-Name` on edge-cacheable responses.
pub const BACKEND_NAME: &str = "fastly-cms";

const UNCACHEABLE: &str = "private, no-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaleDirectives {
    pub stale_while_revalidate: Option<u64>,
    pub stale_if_error: Option<u64>,
}

impl StaleDirectives {
    /// Keep only values that parse and are strictly positive.
    pub fn from_raw(stale_while_revalidate: Option<&str>, stale_if_error: Option<&str>) -> Self {
        Self {
            stale_while_revalidate: positive(stale_while_revalidate),
            stale_if_error: positive(stale_if_error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDirectives {
    pub max_age: u64,
    pub stale: StaleDirectives,
}

impl EdgeDirectives {
    pub fn surrogate_control(&self) -> String {
        format!("max-age={}", self.max_age)
    }

    pub fn cache_control(&self) -> String {
        let mut value = String::from("no-cache");
        if let Some(seconds) = self.stale.stale_while_revalidate {
            value.push_str(&format!(", stale-while-revalidate={seconds}"));
        }
        if let Some(seconds) = self.stale.stale_if_error {
            value.push_str(&format!(", stale-if-error={seconds}"));
        }
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicyDecision {
    Unchanged,
    Uncacheable,
    Edge(EdgeDirectives),
}

impl CachePolicyDecision {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, CachePolicyDecision::Edge(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicyDecision::Unchanged => "unchanged",
            CachePolicyDecision::Uncacheable => "uncacheable",
            CachePolicyDecision::Edge(_) => "edge",
        }
    }

    /// Write the decision onto outgoing response headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        match self {
            CachePolicyDecision::Unchanged => {}
            CachePolicyDecision::Uncacheable => {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static(UNCACHEABLE));
            }
            CachePolicyDecision::Edge(directives) => {
                headers.insert(BACKEND_NAME_HEADER, HeaderValue::from_static(BACKEND_NAME));
                insert_string(headers, SURROGATE_CONTROL, directives.surrogate_control());
                insert_string(headers, CACHE_CONTROL, directives.cache_control());
            }
        }
    }
}

/// Pure decision for one response.
pub fn decide(
    flags: &ContentCacheFlags,
    is_preview: bool,
    default_max_age: i64,
    stale: StaleDirectives,
) -> CachePolicyDecision {
    if is_preview {
        return CachePolicyDecision::Unchanged;
    }

    match flags.do_not_cache.value() {
        None | Some(true) => CachePolicyDecision::Uncacheable,
        Some(false) => {
            let max_age = flags.cache_for_seconds.value().unwrap_or(default_max_age);
            match u64::try_from(max_age) {
                Ok(max_age) if max_age > 0 => {
                    CachePolicyDecision::Edge(EdgeDirectives { max_age, stale })
                }
                _ => CachePolicyDecision::Unchanged,
            }
        }
    }
}

/// Applies the decision table to content responses.
///
/// The default max-age is read once at construction; stale directives are
/// re-read for every response.
#[derive(Clone)]
pub struct CachePolicyWriter {
    settings: SettingsAccessor,
    default_max_age: i64,
}

impl CachePolicyWriter {
    pub fn new(settings: SettingsAccessor) -> Self {
        let raw = settings.get(keys::MAX_AGE, keys::DEFAULT_MAX_AGE);
        let default_max_age = parse_i64(&raw).unwrap_or_else(|| {
            warn!(
                target = "fastly_cms::policy",
                value = %raw,
                "max age is not an integer; edge caching needs a per-content override"
            );
            0
        });
        Self {
            settings,
            default_max_age,
        }
    }

    pub fn default_max_age(&self) -> i64 {
        self.default_max_age
    }

    pub fn decide(&self, content: &ContentItem, is_preview: bool) -> CachePolicyDecision {
        let stale = StaleDirectives::from_raw(
            self.settings.lookup(keys::STALE_WHILE_REVALIDATE).as_deref(),
            self.settings.lookup(keys::STALE_IF_ERROR).as_deref(),
        );
        decide(&content.flags, is_preview, self.default_max_age, stale)
    }

    /// Decide and mutate `headers` for one outgoing content response.
    pub fn write(
        &self,
        content: &ContentItem,
        is_preview: bool,
        headers: &mut HeaderMap,
    ) -> CachePolicyDecision {
        let decision = self.decide(content, is_preview);

        if decision.is_cacheable()
            && self.settings.get_bool(keys::DISABLE_SESSION_AFFINITY) == Some(true)
        {
            // Placeholder toggle: no affinity header is emitted yet.
            debug!(
                target = "fastly_cms::policy",
                content_id = %content.id,
                "session affinity toggle is set but has no effect"
            );
        }

        decision.apply(headers);
        counter!("fastly_cache_policy_total", "outcome" => decision.as_str()).increment(1);
        debug!(
            target = "fastly_cms::policy",
            content_id = %content.id,
            preview = is_preview,
            outcome = decision.as_str(),
            "cache policy applied"
        );
        decision
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(parse_i64)
        .filter(|value| *value > 0)
        .and_then(|value| u64::try_from(value).ok())
}

fn insert_string(headers: &mut HeaderMap, name: HeaderName, value: String) {
    match HeaderValue::try_from(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(err) => warn!(
            target = "fastly_cms::policy",
            header = %name,
            error = %err,
            "header value rejected"
        ),
    }
}
