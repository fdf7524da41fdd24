//! Post-processing of the SVG document the d2 CLI writes.
//!
//! The CLI emits a nested document: an outer `<svg>` carrying the viewport
//! and an inner `<svg>` with the drawing. The outer element becomes artifact
//! metadata and everything inside it becomes the body, so callers can re-wrap
//! the body with their own attributes.

use lol_html::{RewriteStrSettings, doc_comments, doc_text, rewrite_str};
use roxmltree::{Document, Node};

use crate::domain::artifact::SvgArtifact;

use super::types::RenderError;

/// Split `svg` into outer-element metadata and inner body.
///
/// `default_aspect_ratio` applies when the outer element has no
/// `preserveAspectRatio` attribute.
pub(crate) fn split_outer_svg(
    svg: &str,
    default_aspect_ratio: &str,
) -> Result<SvgArtifact, RenderError> {
    let document = Document::parse(svg).map_err(|err| RenderError::svg(err.to_string()))?;
    let root = document.root_element();
    if root.tag_name().name() != "svg" {
        return Err(RenderError::svg(format!(
            "expected an <svg> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let width = dimension(root, "width")?;
    let height = dimension(root, "height")?;
    let view_box = root
        .attribute("viewBox")
        .map(str::to_string)
        .unwrap_or_else(|| format!("0 0 {width} {height}"));
    let preserve_aspect_ratio = root
        .attribute("preserveAspectRatio")
        .unwrap_or(default_aspect_ratio)
        .to_string();

    let body = match (root.first_child(), root.last_child()) {
        (Some(first), Some(last)) => svg[first.range().start..last.range().end].to_string(),
        _ => String::new(),
    };

    Ok(SvgArtifact {
        body,
        width,
        height,
        view_box,
        preserve_aspect_ratio,
    })
}

fn dimension(node: Node<'_, '_>, name: &'static str) -> Result<i32, RenderError> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| RenderError::svg(format!("outer <svg> is missing `{name}`")))?;
    let trimmed = raw.trim().trim_end_matches("px");
    trimmed
        .parse::<i32>()
        .or_else(|_| trimmed.parse::<f64>().map(|value| value.round() as i32))
        .map_err(|_| RenderError::svg(format!("outer <svg> has a non-numeric `{name}`: {raw}")))
}

/// Drop comments and whitespace-only text between elements.
///
/// CDATA sections surface as comments outside foreign content and are kept.
pub(crate) fn minify_svg(body: &str) -> Result<String, RenderError> {
    rewrite_str(
        body,
        RewriteStrSettings {
            document_content_handlers: vec![
                doc_comments!(|comment| {
                    if !comment.text().starts_with("[CDATA[") {
                        comment.remove();
                    }
                    Ok(())
                }),
                doc_text!(|chunk| {
                    if chunk.as_str().trim().is_empty() {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Minify {
        message: err.to_string(),
    })
}
