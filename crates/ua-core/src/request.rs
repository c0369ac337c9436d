//! Effective user-agent selection from request headers.

use serde::Serialize;
use std::collections::BTreeMap;
use ua_config::DEFAULT_HEADER_PRECEDENCE;
use ua_normalize::Pipeline;

/// One lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    /// Effective user agent; empty when no header supplied one.
    pub user_agent: String,
    /// Header the effective user agent came from.
    pub source: Option<String>,
    /// Effective user agent after the generic normalizer stages.
    pub normalized: String,
    /// Every header received, with canonical lowercase names.
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn is_empty(&self) -> bool {
        self.user_agent.trim().is_empty()
    }
}

/// Builds [`Request`]s using a header precedence list.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    precedence: Vec<String>,
    generic: Pipeline,
}

impl Default for RequestFactory {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_PRECEDENCE.iter().copied())
    }
}

impl RequestFactory {
    /// `precedence` lists header names, highest priority first.
    pub fn new<I, S>(precedence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            precedence: precedence
                .into_iter()
                .map(|h| canonical_header(h.as_ref()))
                .collect(),
            generic: Pipeline::generic(),
        }
    }

    pub fn precedence(&self) -> &[String] {
        &self.precedence
    }

    /// A request for a bare user-agent string.
    pub fn from_user_agent(&self, ua: &str) -> Request {
        self.from_headers([("user-agent", ua)])
    }

    /// Picks the first non-empty header in precedence order.
    ///
    /// Names match case-insensitively; CGI-style names (`HTTP_USER_AGENT`)
    /// are accepted too. When a name repeats, the last value wins.
    pub fn from_headers<I, K, V>(&self, headers: I) -> Request
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let headers: BTreeMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (canonical_header(k.as_ref()), v.as_ref().to_string()))
            .collect();

        let effective = self.precedence.iter().find_map(|name| {
            headers
                .get(name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name.clone(), v.clone()))
        });

        let (source, user_agent) = match effective {
            Some((name, value)) => (Some(name), value),
            None => (None, String::new()),
        };
        let normalized = self.generic.normalize(&user_agent);
        Request {
            user_agent,
            source,
            normalized,
            headers,
        }
    }
}

/// Lowercases and maps `HTTP_X_FOO` to `x-foo`.
fn canonical_header(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    let lower = lower.strip_prefix("http_").unwrap_or(&lower);
    lower.replace('_', "-")
}
