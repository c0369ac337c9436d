//! Ordered handler chain that maps a user agent to a device id.
//!
//! Every handler owns one family of user agents. The chain asks each handler
//! in registration order whether it can handle the request; the first one
//! that can is the only one consulted. The catch-all handler is always last
//! and accepts everything, so resolution never fails.
//!
//! Inside a handler, resolution degrades step by step:
//!
//! | Step       | Source                                               |
//! |------------|------------------------------------------------------|
//! | exact      | handler bucket of the UA index                       |
//! | conclusive | prefix or edit-distance search over the bucket       |
//! | recovery   | family default ids                                   |
//! | catch-all  | desktop analysis and mobile keyword table            |
//! | root       | the repository root                                  |
//!
//! A step's answer counts only if it is neither blank nor `generic` and the
//! repository actually contains it.

pub mod browsers;
pub mod catch_all;
pub mod platforms;
pub mod utils;
pub mod vendors;

use serde::Serialize;
use tracing::debug;
use ua_common::ids::{self, GENERIC_WEB_BROWSER};
use ua_config::MatchMode;
use ua_normalize::{Pipeline, Stage};

use crate::index::{Bucket, UaIndex};
use crate::matchers::{levenshtein_match, prefix_match};
use crate::repository::Repository;

/// A user agent with its keyword flags computed once per request.
#[derive(Debug, Clone)]
pub struct UserAgent {
    text: String,
    lower: String,
    mobile: bool,
    desktop: bool,
    smart_tv: bool,
}

impl UserAgent {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lower = text.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));
        let mobile = has(utils::MOBILE_KEYWORDS);
        let desktop = has(utils::DESKTOP_KEYWORDS);
        let smart_tv = has(utils::SMART_TV_KEYWORDS);
        Self {
            text,
            lower,
            mobile,
            desktop,
            smart_tv,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lowercase(&self) -> &str {
        &self.lower
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    pub fn is_desktop(&self) -> bool {
        self.desktop
    }

    pub fn is_smart_tv(&self) -> bool {
        self.smart_tv
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    pub fn contains_any(&self, needles: &[&str]) -> bool {
        utils::contains_any(&self.text, needles)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.text.starts_with(prefix)
    }

    pub fn starts_with_any(&self, prefixes: &[&str]) -> bool {
        utils::starts_with_any(&self.text, prefixes)
    }
}

/// Read access to the index and repository while one handler matches.
pub struct MatchContext<'a> {
    repository: &'a Repository,
    bucket: Option<&'a Bucket>,
    mode: MatchMode,
}

impl<'a> MatchContext<'a> {
    pub fn new(repository: &'a Repository, bucket: &str, mode: MatchMode) -> Self {
        Self {
            repository,
            bucket: repository.index().bucket(bucket),
            mode,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn index(&self) -> &'a UaIndex {
        self.repository.index()
    }

    /// Id indexed under exactly `ua` in the handler's bucket.
    pub fn exact(&self, ua: &str) -> Option<String> {
        exact_in(self.bucket, ua)
    }

    /// Longest-prefix search over the handler's bucket.
    pub fn ris(&self, ua: &str, tolerance: usize) -> Option<String> {
        ris_in(self.bucket, ua, tolerance)
    }

    /// Edit-distance search over the handler's bucket; skipped in
    /// performance mode.
    pub fn ld(&self, ua: &str, tolerance: usize) -> Option<String> {
        self.ld_in(self.bucket, ua, tolerance)
    }

    pub fn ld_in(&self, bucket: Option<&Bucket>, ua: &str, tolerance: usize) -> Option<String> {
        if self.mode == MatchMode::Performance {
            return None;
        }
        let bucket = bucket?;
        levenshtein_match(bucket.uas(), ua, tolerance)
            .and_then(|idx| bucket.id_at(idx))
            .map(str::to_string)
    }
}

pub(crate) fn exact_in(bucket: Option<&Bucket>, ua: &str) -> Option<String> {
    bucket?.exact(ua).map(str::to_string)
}

pub(crate) fn ris_in(bucket: Option<&Bucket>, ua: &str, tolerance: usize) -> Option<String> {
    let bucket = bucket?;
    prefix_match(bucket.uas(), ua, tolerance)
        .and_then(|idx| bucket.id_at(idx))
        .map(str::to_string)
}

/// One family matcher.
pub trait Handler: Send + Sync {
    /// Family name, also the name of the handler's index bucket.
    fn name(&self) -> &'static str;

    fn can_handle(&self, ua: &UserAgent) -> bool;

    /// Family-specific normalizer stage run after the generic stages.
    fn stage(&self) -> Option<Stage> {
        None
    }

    /// Extra bucket an indexed user agent is also filed under.
    fn secondary_bucket(&self, _normalized: &str) -> Option<&'static str> {
        None
    }

    fn exact(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.exact(ua)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.ris(ua, utils::first_slash(ua))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        None
    }
}

/// Which step produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Exact,
    Conclusive,
    Recovery,
    CatchAll,
    /// Performance-mode desktop shortcut.
    Desktop,
    Root,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Exact => "exact",
            Step::Conclusive => "conclusive",
            Step::Recovery => "recovery",
            Step::CatchAll => "catch_all",
            Step::Desktop => "desktop",
            Step::Root => "root",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler selected for a user agent and the user agent in that handler's
/// normal form.
#[derive(Debug, Clone)]
pub struct Classification {
    pub handler: &'static str,
    pub position: usize,
    pub agent: UserAgent,
    pub normalized: String,
}

/// Result of resolving one user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub device_id: String,
    pub handler: &'static str,
    pub step: Step,
    pub normalized: String,
}

struct Entry {
    handler: Box<dyn Handler>,
    pipeline: Pipeline,
}

/// The ordered matcher registry.
pub struct Chain {
    generic: Pipeline,
    entries: Vec<Entry>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::standard()
    }
}

impl Chain {
    /// Builds a chain from handlers in the order given. The last handler
    /// should accept every user agent.
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        let generic = Pipeline::generic();
        let entries = handlers
            .into_iter()
            .map(|handler| {
                let pipeline = match handler.stage() {
                    Some(stage) => generic.with_stage(stage),
                    None => generic.clone(),
                };
                Entry { handler, pipeline }
            })
            .collect();
        Self { generic, entries }
    }

    /// The standard registration order.
    pub fn standard() -> Self {
        let mut handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(platforms::JavaMidlet),
            Box::new(platforms::SmartTv),
            Box::new(platforms::Kindle),
            Box::new(platforms::LgUplus),
            Box::new(platforms::Android),
            Box::new(platforms::Apple),
            Box::new(platforms::WindowsPhoneDesktop),
            Box::new(platforms::WindowsPhone),
            Box::new(platforms::NokiaOviBrowser),
            Box::new(vendors::Nokia),
            Box::new(vendors::Samsung),
            Box::new(vendors::BlackBerry),
            Box::new(vendors::SonyEricsson),
            Box::new(vendors::Motorola),
        ];
        handlers.extend(vendors::simple(&["alcatel", "benq"]));
        handlers.push(Box::new(vendors::DoCoMo));
        handlers.extend(vendors::simple(&["grundig"]));
        handlers.push(Box::new(platforms::HtcMac));
        handlers.extend(vendors::simple(&["htc"]));
        handlers.push(Box::new(vendors::Kddi));
        handlers.extend(vendors::simple(&["kyocera"]));
        handlers.push(Box::new(vendors::Lg));
        handlers.extend(vendors::simple(&["mitsubishi"]));
        handlers.push(Box::new(vendors::Nec));
        handlers.push(Box::new(vendors::Nintendo));
        handlers.extend(vendors::simple(&["panasonic", "pantech", "philips"]));
        handlers.push(Box::new(vendors::Portalmmm));
        handlers.extend(vendors::simple(&["qtek"]));
        handlers.push(Box::new(vendors::Reksio));
        handlers.extend(vendors::simple(&[
            "sagem", "sanyo", "sharp", "siemens", "spv", "toshiba", "vodafone",
        ]));
        handlers.push(Box::new(platforms::WebOs));
        handlers.push(Box::new(platforms::OperaMini));
        handlers.push(Box::new(browsers::BotCrawlerTranscoder));
        handlers.push(Box::new(browsers::Chrome));
        handlers.push(Box::new(browsers::Firefox));
        handlers.push(Box::new(browsers::Msie));
        handlers.push(Box::new(browsers::Opera));
        handlers.push(Box::new(browsers::Safari));
        handlers.push(Box::new(browsers::Konqueror));
        handlers.push(Box::new(catch_all::CatchAll));
        Self::new(handlers)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handler names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.handler.name())
    }

    pub fn handler(&self, name: &str) -> Option<&dyn Handler> {
        self.entries
            .iter()
            .find(|e| e.handler.name() == name)
            .map(|e| e.handler.as_ref())
    }

    /// Selects the handler for `raw` and normalizes it for that handler.
    ///
    /// Returns `None` only for a chain without a catch-all handler.
    pub fn classify(&self, raw: &str) -> Option<Classification> {
        let agent = UserAgent::new(self.generic.normalize(raw));
        let position = self
            .entries
            .iter()
            .position(|e| e.handler.can_handle(&agent))?;
        let entry = &self.entries[position];
        let normalized = entry.pipeline.normalize(agent.as_str());
        Some(Classification {
            handler: entry.handler.name(),
            position,
            agent,
            normalized,
        })
    }

    /// Buckets a device user agent is indexed under, with its normalized form.
    pub fn index_keys(&self, raw: &str) -> Option<(Vec<&'static str>, String)> {
        let classification = self.classify(raw)?;
        let handler = &self.entries[classification.position].handler;
        let mut buckets = vec![handler.name()];
        buckets.extend(handler.secondary_bucket(&classification.normalized));
        Some((buckets, classification.normalized))
    }

    /// Resolves `raw` to a device id. Never fails; the worst answer is the
    /// repository root.
    pub fn resolve(&self, repository: &Repository, mode: MatchMode, raw: &str) -> MatchOutcome {
        let root = repository.root().id.clone();

        if mode == MatchMode::Performance && repository.contains(GENERIC_WEB_BROWSER) {
            let agent = UserAgent::new(self.generic.normalize(raw));
            if catch_all::is_desktop_heavy_duty(&agent, agent.as_str()) {
                debug!(ua = raw, "desktop shortcut in performance mode");
                return MatchOutcome {
                    device_id: GENERIC_WEB_BROWSER.to_string(),
                    handler: "desktop",
                    step: Step::Desktop,
                    normalized: agent.as_str().to_string(),
                };
            }
        }

        let Some(classification) = self.classify(raw) else {
            return MatchOutcome {
                device_id: root,
                handler: "none",
                step: Step::Root,
                normalized: raw.to_string(),
            };
        };

        let handler = &self.entries[classification.position].handler;
        let ctx = MatchContext::new(repository, handler.name(), mode);
        let ua = classification.normalized.as_str();
        let accept = |id: Option<String>| {
            id.filter(|id| !ids::is_blank_or_generic(id) && repository.contains(id))
        };

        let (device_id, step) = if let Some(id) = accept(handler.exact(&ctx, ua)) {
            (id, Step::Exact)
        } else if let Some(id) = accept(handler.conclusive(&ctx, ua)) {
            (id, Step::Conclusive)
        } else if let Some(id) = accept(handler.recovery(&ctx, ua)) {
            (id, Step::Recovery)
        } else if let Some(id) = accept(catch_all::recover(&classification.agent, ua)) {
            (id, Step::CatchAll)
        } else {
            (root, Step::Root)
        };

        debug!(
            handler = handler.name(),
            step = step.as_str(),
            device_id = %device_id,
            "user agent resolved"
        );

        MatchOutcome {
            device_id,
            handler: handler.name(),
            step,
            normalized: classification.normalized,
        }
    }
}
