//! Entry point for host pipelines: turn diagram source plus call-site options
//! into a cached [`Diagram`].

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{
    application::{
        error::{ArgumentError, DiagramError},
        options::{overrides_from_map, resolve},
        render::{RendererSet, render_goat},
    },
    cache::{CacheConfig, CacheKey, DiagramCache, build_goat_key, build_key, codec},
    config::Settings,
    domain::{
        artifact::SvgArtifact,
        options::{DiagramOptions, OptionOverrides},
    },
};

/// Diagram service for one build or run session.
///
/// Cheap to share: the cache is reference counted and every other field is
/// read-only after construction.
#[derive(Debug, Clone)]
pub struct Diagrams {
    defaults: DiagramOptions,
    site: OptionOverrides,
    cache: Arc<DiagramCache>,
    renderers: RendererSet,
}

impl Diagrams {
    pub fn new(site: OptionOverrides, cache: Arc<DiagramCache>, renderers: RendererSet) -> Self {
        Self {
            defaults: DiagramOptions::default(),
            site,
            cache,
            renderers,
        }
    }

    /// Build the session from loaded settings, opening the persistent tier.
    pub fn from_settings(settings: &Settings) -> Result<Self, DiagramError> {
        let cache = DiagramCache::open(&CacheConfig::from(&settings.cache))?;
        Ok(Self::new(
            settings.diagrams.clone(),
            Arc::new(cache),
            RendererSet::from(&settings.render),
        ))
    }

    pub fn cache(&self) -> &DiagramCache {
        &self.cache
    }

    /// Positional call surface: `d2(source)` or `d2(source, options)`.
    pub fn d2(&self, args: &[Value]) -> Result<Diagram, DiagramError> {
        let (source, options) = match args {
            [source] => (source, None),
            [source, options] => (source, Some(options)),
            _ => return Err(ArgumentError::Arity.into()),
        };
        let source = source.as_str().ok_or(ArgumentError::SourceNotString)?;
        if source.is_empty() {
            return Err(ArgumentError::EmptySource.into());
        }
        let call = match options {
            None => OptionOverrides::default(),
            Some(Value::Object(map)) => overrides_from_map(map)?,
            Some(_) => return Err(ArgumentError::OptionsNotMap.into()),
        };
        self.render_d2(source, &call)
    }

    /// ASCII-art diagram from one value. Scalars are coerced to text and a
    /// missing value renders an empty canvas.
    pub fn goat(&self, source: &Value) -> Result<Diagram, DiagramError> {
        let text = match source {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            Value::Bool(_) | Value::Number(_) => source.to_string(),
            Value::Array(_) | Value::Object(_) => return Err(ArgumentError::SourceNotString.into()),
        };
        self.render_goat(&text)
    }

    pub fn render_goat(&self, source: &str) -> Result<Diagram, DiagramError> {
        let key = build_goat_key(source);
        debug!(
            target = "application::diagrams",
            op = "diagrams::render_goat",
            cache_key = %key,
            "Rendering goat diagram"
        );
        let bytes = self.cache.get_or_create(&key, || {
            let artifact = render_goat(source)?;
            codec::encode(&artifact).map_err(DiagramError::Encode)
        })?;
        self.decode(key, &bytes)
    }

    /// Resolve options for one call without rendering.
    pub fn resolve(&self, call: &OptionOverrides) -> Result<DiagramOptions, DiagramError> {
        resolve(&self.defaults, &self.site, call)
    }

    /// The key `render_d2` would look up for these inputs.
    pub fn cache_key(&self, source: &str, call: &OptionOverrides) -> Result<CacheKey, DiagramError> {
        if source.is_empty() {
            return Err(ArgumentError::EmptySource.into());
        }
        let options = self.resolve(call)?;
        Ok(build_key(source, &options))
    }

    pub fn render_d2(&self, source: &str, call: &OptionOverrides) -> Result<Diagram, DiagramError> {
        if source.is_empty() {
            return Err(ArgumentError::EmptySource.into());
        }
        let options = self.resolve(call)?;
        let engine = options.layout()?;
        let key = build_key(source, &options);
        debug!(
            target = "application::diagrams",
            op = "diagrams::render_d2",
            cache_key = %key,
            layout = %engine,
            "Resolved diagram options"
        );

        let renderer = self.renderers.for_engine(engine);
        let bytes = self.cache.get_or_create(&key, || {
            let artifact = renderer.render(source, &options)?;
            codec::encode(&artifact).map_err(DiagramError::Encode)
        })?;
        self.decode(key, &bytes)
    }

    fn decode(&self, key: CacheKey, bytes: &[u8]) -> Result<Diagram, DiagramError> {
        let artifact = codec::decode(bytes).map_err(|err| DiagramError::Corrupt {
            key: key.to_string(),
            source: err,
        })?;
        Ok(Diagram {
            key,
            artifact: Arc::new(artifact),
        })
    }
}

/// A cached diagram as seen by templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    key: CacheKey,
    artifact: Arc<SvgArtifact>,
}

impl Diagram {
    /// Complete `<svg>` element, ready to embed.
    pub fn wrapped(&self) -> String {
        self.artifact.wrapped()
    }

    /// Body without the outer `<svg>` element.
    pub fn inner(&self) -> &str {
        &self.artifact.body
    }

    pub fn width(&self) -> i32 {
        self.artifact.width
    }

    pub fn height(&self) -> i32 {
        self.artifact.height
    }

    pub fn view_box(&self) -> &str {
        &self.artifact.view_box
    }

    pub fn preserve_aspect_ratio(&self) -> &str {
        &self.artifact.preserve_aspect_ratio
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }
}
