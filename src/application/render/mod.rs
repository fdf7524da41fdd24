//! Diagram renderers.
//!
//! Each [`LayoutEngine`] maps to one [`DiagramRenderer`]. Engine names are
//! checked during option validation, so dispatch here cannot fail.

mod d2;
mod goat;
mod svg;
mod types;

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{config::RenderSettings, domain::options::LayoutEngine};

pub use d2::D2CliRenderer;
pub use goat::{GOAT_ASPECT_RATIO, render_goat};
pub use types::{DiagramRenderer, RenderError};

/// One renderer per layout engine.
#[derive(Clone)]
pub struct RendererSet {
    dagre: Arc<dyn DiagramRenderer>,
    elk: Arc<dyn DiagramRenderer>,
}

impl RendererSet {
    pub fn new(dagre: Arc<dyn DiagramRenderer>, elk: Arc<dyn DiagramRenderer>) -> Self {
        Self { dagre, elk }
    }

    /// Route every engine to the same renderer.
    pub fn uniform(renderer: Arc<dyn DiagramRenderer>) -> Self {
        Self {
            dagre: Arc::clone(&renderer),
            elk: renderer,
        }
    }

    pub fn d2_cli(cli_path: impl Into<PathBuf>) -> Self {
        let cli_path = cli_path.into();
        Self {
            dagre: Arc::new(D2CliRenderer::new(cli_path.clone(), LayoutEngine::Dagre)),
            elk: Arc::new(D2CliRenderer::new(cli_path, LayoutEngine::Elk)),
        }
    }

    pub fn for_engine(&self, engine: LayoutEngine) -> &dyn DiagramRenderer {
        match engine {
            LayoutEngine::Dagre => self.dagre.as_ref(),
            LayoutEngine::Elk => self.elk.as_ref(),
        }
    }
}

impl From<&RenderSettings> for RendererSet {
    fn from(settings: &RenderSettings) -> Self {
        Self::d2_cli(settings.d2_cli_path.clone())
    }
}

impl fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererSet")
            .field("engines", &LayoutEngine::ALL)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{artifact::SvgArtifact, options::DiagramOptions};

    struct Tagged(&'static str, Mutex<usize>);

    impl DiagramRenderer for Tagged {
        fn render(
            &self,
            _source: &str,
            options: &DiagramOptions,
        ) -> Result<SvgArtifact, RenderError> {
            *self.1.lock().expect("counter") += 1;
            Ok(SvgArtifact {
                body: self.0.to_string(),
                preserve_aspect_ratio: options.preserve_aspect_ratio().to_string(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn dispatches_by_engine() {
        let set = RendererSet::new(
            Arc::new(Tagged("dagre", Mutex::new(0))),
            Arc::new(Tagged("elk", Mutex::new(0))),
        );
        let options = DiagramOptions::default();

        for engine in LayoutEngine::ALL {
            let artifact = set
                .for_engine(engine)
                .render("x -> y", &options)
                .expect("render");
            assert_eq!(artifact.body, engine.as_str());
        }
    }

    #[test]
    fn uniform_shares_one_renderer() {
        let renderer = Arc::new(Tagged("any", Mutex::new(0)));
        let set = RendererSet::uniform(renderer.clone());
        let options = DiagramOptions {
            center: true,
            ..Default::default()
        };

        for engine in LayoutEngine::ALL {
            let artifact = set
                .for_engine(engine)
                .render("x -> y", &options)
                .expect("render");
            assert_eq!(artifact.preserve_aspect_ratio, "xMidYMid meet");
        }
        assert_eq!(*renderer.1.lock().expect("counter"), 2);
    }
}
