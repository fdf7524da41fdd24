//! Diagram rendering options.
//!
//! [`DiagramOptions`] is the fully-populated record a cache key is computed
//! from. [`OptionOverrides`] is one partially-populated layer (site
//! configuration or call-site arguments) merged on top of it.

use std::{fmt, str::FromStr};

use super::error::ValidationError;

pub const DEFAULT_DARK_THEME: &str = "Dark Flagship Terrastruct";
pub const DEFAULT_LAYOUT_ENGINE: &str = "dagre";
pub const DEFAULT_LIGHT_THEME: &str = "Neutral Default";
pub const MAX_PADDING: u16 = 1000;
pub const MAX_SCALE: f64 = 100.0;

/// Layout engines D2 can arrange diagram elements with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutEngine {
    Dagre,
    Elk,
}

impl LayoutEngine {
    pub const ALL: [LayoutEngine; 2] = [LayoutEngine::Dagre, LayoutEngine::Elk];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutEngine::Dagre => "dagre",
            LayoutEngine::Elk => "elk",
        }
    }
}

impl FromStr for LayoutEngine {
    type Err = ValidationError;

    /// Exact, case-sensitive match.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" => Err(ValidationError::EmptyLayoutEngine),
            "dagre" => Ok(LayoutEngine::Dagre),
            "elk" => Ok(LayoutEngine::Elk),
            _ => Err(ValidationError::UnsupportedLayoutEngine),
        }
    }
}

impl fmt::Display for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramOptions {
    /// Center the diagram in the viewport (`xMidYMid meet` instead of `xMinYMin meet`).
    pub center: bool,
    /// Theme used when the reader's system is in dark mode.
    pub dark_theme: String,
    pub layout_engine: String,
    /// Theme used in light mode or when the reader has no preference.
    pub light_theme: String,
    pub minify: bool,
    /// Pixels of padding on each side, at most 1000.
    pub padding: u16,
    /// Distinguishes otherwise identical diagrams embedded in the same document.
    pub salt: String,
    /// Zoom factor in `(0, 100]`.
    pub scale: f64,
    /// Hand-drawn rendering style.
    pub sketch: bool,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            center: false,
            dark_theme: DEFAULT_DARK_THEME.to_string(),
            layout_engine: DEFAULT_LAYOUT_ENGINE.to_string(),
            light_theme: DEFAULT_LIGHT_THEME.to_string(),
            minify: true,
            padding: 0,
            salt: String::new(),
            scale: 1.0,
            sketch: false,
        }
    }
}

impl DiagramOptions {
    /// Overwrite every field the layer sets explicitly; unset fields fall through.
    pub fn apply(&mut self, overrides: &OptionOverrides) {
        if let Some(center) = overrides.center {
            self.center = center;
        }
        if let Some(theme) = overrides.dark_theme.as_ref() {
            self.dark_theme = theme.clone();
        }
        if let Some(engine) = overrides.layout_engine.as_ref() {
            self.layout_engine = engine.clone();
        }
        if let Some(theme) = overrides.light_theme.as_ref() {
            self.light_theme = theme.clone();
        }
        if let Some(minify) = overrides.minify {
            self.minify = minify;
        }
        if let Some(padding) = overrides.padding {
            self.padding = padding;
        }
        if let Some(salt) = overrides.salt.as_ref() {
            self.salt = salt.clone();
        }
        if let Some(scale) = overrides.scale {
            self.scale = scale;
        }
        if let Some(sketch) = overrides.sketch {
            self.sketch = sketch;
        }
    }

    /// Run the ordered option checks, returning the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.dark_theme.is_empty() {
            return Err(ValidationError::EmptyDarkTheme);
        }
        self.layout()?;
        if self.light_theme.is_empty() {
            return Err(ValidationError::EmptyLightTheme);
        }
        if self.padding > MAX_PADDING {
            return Err(ValidationError::PaddingOutOfRange);
        }
        // NaN fails both comparisons and is rejected here too.
        if !(self.scale > 0.0 && self.scale <= MAX_SCALE) {
            return Err(ValidationError::ScaleOutOfRange);
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<LayoutEngine, ValidationError> {
        self.layout_engine.parse()
    }

    /// Value of the SVG `preserveAspectRatio` attribute implied by `center`.
    pub fn preserve_aspect_ratio(&self) -> &'static str {
        if self.center {
            "xMidYMid meet"
        } else {
            "xMinYMin meet"
        }
    }
}

/// One merge layer. `None` leaves the underlying value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionOverrides {
    pub center: Option<bool>,
    pub dark_theme: Option<String>,
    pub layout_engine: Option<String>,
    pub light_theme: Option<String>,
    pub minify: Option<bool>,
    pub padding: Option<u16>,
    pub salt: Option<String>,
    pub scale: Option<f64>,
    pub sketch: Option<bool>,
}
