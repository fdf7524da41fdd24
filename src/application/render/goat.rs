//! In-process ASCII-art renderer.
//!
//! Goat diagrams have no options: the viewport is always `0 0 W H` of the
//! drawn canvas and the diagram is centred.

use std::time::Instant;

use tracing::debug;

use crate::domain::artifact::SvgArtifact;

use super::svg::split_outer_svg;
use super::types::RenderError;

pub const GOAT_ASPECT_RATIO: &str = "xMidYMid meet";

/// Render ASCII art to an artifact. Any text is accepted, including an empty string.
pub fn render_goat(source: &str) -> Result<SvgArtifact, RenderError> {
    let started_at = Instant::now();
    let svg = svgbob::to_svg(source);

    let mut artifact = split_outer_svg(&svg, GOAT_ASPECT_RATIO)?;
    artifact.view_box = format!("0 0 {} {}", artifact.width, artifact.height);
    artifact.preserve_aspect_ratio = GOAT_ASPECT_RATIO.to_string();

    debug!(
        target = "application::render::goat",
        op = "goat::render",
        result = "rendered",
        width = artifact.width,
        height = artifact.height,
        body_bytes = artifact.body.len(),
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "Goat diagram rendered"
    );

    Ok(artifact)
}
