use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

impl ScrollPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the rect lies entirely inside `viewport`.
    pub fn is_within(&self, viewport: &Viewport) -> bool {
        self.y >= 0.0
            && self.x >= 0.0
            && self.bottom() <= f64::from(viewport.height)
            && self.right() <= f64::from(viewport.width)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag_name: String,
    pub element_id: Option<String>,
    pub class_name: Option<String>,
    pub text_content: Option<String>,
    pub attributes: HashMap<String, String>,
    pub rect: Option<ElementRect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

impl ScrollBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollBehavior::Auto => "auto",
            ScrollBehavior::Smooth => "smooth",
        }
    }
}

/// Vertical alignment used by scroll-into-view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBlock {
    #[default]
    Start,
    Center,
    End,
    Nearest,
}

impl ScrollBlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollBlock::Start => "start",
            ScrollBlock::Center => "center",
            ScrollBlock::End => "end",
            ScrollBlock::Nearest => "nearest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Politeness {
    #[default]
    Polite,
    Assertive,
}

impl Politeness {
    pub fn aria_live(&self) -> &'static str {
        match self {
            Politeness::Polite => "polite",
            Politeness::Assertive => "assertive",
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Politeness::Polite => "status",
            Politeness::Assertive => "alert",
        }
    }
}

/// Optional host features the helpers check before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Closest,
    MatchMedia,
    SmoothScroll,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Closest => "closest",
            Capability::MatchMedia => "matchMedia",
            Capability::SmoothScroll => "smooth scroll",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    TargetNotFound,
    FormNotFound,
    InvalidElementNotFound,
    AlreadyInView,
    CapabilityMissing(Capability),
    NoBody,
}

/// What a helper did. Helpers never fail outward; host errors they swallow
/// surface here as `Suppressed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
    Suppressed(String),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Outcome::Skipped(reason)
    }

    pub fn suppressed<E: fmt::Display>(err: E) -> Self {
        Outcome::Suppressed(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusScrollOutcome {
    pub focus: Outcome,
    pub scroll: Outcome,
}
