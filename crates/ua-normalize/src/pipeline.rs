//! Stage registry and composable pipelines.

use std::fmt;

use crate::{generic, specific};

/// A single normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    // Generic stages
    UpLink,
    BlackBerry,
    YesWap,
    BabelFish,
    SerialNumbers,
    NovarraGoogleTranslator,
    LocaleRemover,
    Ucweb,

    // Family-specific stages
    Android,
    Chrome,
    Firefox,
    HtcMac,
    Kindle,
    Konqueror,
    Lg,
    LgUplus,
    Msie,
    Opera,
    Safari,
    WebOs,
}

impl Stage {
    /// The generic stages, in the order they run.
    pub const GENERIC: [Stage; 8] = [
        Stage::UpLink,
        Stage::BlackBerry,
        Stage::YesWap,
        Stage::BabelFish,
        Stage::SerialNumbers,
        Stage::NovarraGoogleTranslator,
        Stage::LocaleRemover,
        Stage::Ucweb,
    ];

    /// Applies this stage once.
    pub fn apply(self, ua: &str) -> String {
        match self {
            Stage::UpLink => generic::up_link(ua),
            Stage::BlackBerry => generic::blackberry(ua),
            Stage::YesWap => generic::yes_wap(ua),
            Stage::BabelFish => generic::babel_fish(ua),
            Stage::SerialNumbers => generic::serial_numbers(ua),
            Stage::NovarraGoogleTranslator => generic::novarra_google_translator(ua),
            Stage::LocaleRemover => generic::locale_remover(ua),
            Stage::Ucweb => generic::ucweb(ua),
            Stage::Android => specific::android(ua),
            Stage::Chrome => specific::chrome(ua),
            Stage::Firefox => specific::firefox(ua),
            Stage::HtcMac => specific::htc_mac(ua),
            Stage::Kindle => specific::kindle(ua),
            Stage::Konqueror => specific::konqueror(ua),
            Stage::Lg => specific::lg(ua),
            Stage::LgUplus => specific::lguplus(ua),
            Stage::Msie => specific::msie(ua),
            Stage::Opera => specific::opera(ua),
            Stage::Safari => specific::safari(ua),
            Stage::WebOs => specific::webos(ua),
        }
    }

    pub fn is_generic(self) -> bool {
        Self::GENERIC.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::UpLink => "up_link",
            Stage::BlackBerry => "blackberry",
            Stage::YesWap => "yes_wap",
            Stage::BabelFish => "babel_fish",
            Stage::SerialNumbers => "serial_numbers",
            Stage::NovarraGoogleTranslator => "novarra_google_translator",
            Stage::LocaleRemover => "locale_remover",
            Stage::Ucweb => "ucweb",
            Stage::Android => "android",
            Stage::Chrome => "chrome",
            Stage::Firefox => "firefox",
            Stage::HtcMac => "htc_mac",
            Stage::Kindle => "kindle",
            Stage::Konqueror => "konqueror",
            Stage::Lg => "lg",
            Stage::LgUplus => "lguplus",
            Stage::Msie => "msie",
            Stage::Opera => "opera",
            Stage::Safari => "safari",
            Stage::WebOs => "webos",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered list of stages applied until the output stops changing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// A pipeline that returns its input unchanged.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The generic stages shared by every matcher.
    pub fn generic() -> Self {
        Self::new(Stage::GENERIC.to_vec())
    }

    /// Returns a copy of this pipeline with `stage` appended.
    pub fn with_stage(&self, stage: Stage) -> Self {
        let mut stages = self.stages.clone();
        stages.push(stage);
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Normalizes `ua`; the result is a fixed point of this pipeline.
    ///
    /// Terminates because every stage either shrinks its input or adds a
    /// prefix guarded against being added twice.
    pub fn normalize(&self, ua: &str) -> String {
        let mut current = ua.to_string();
        loop {
            let next = self.apply_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn apply_once(&self, ua: &str) -> String {
        self.stages
            .iter()
            .fold(ua.to_string(), |acc, stage| stage.apply(&acc))
    }
}
