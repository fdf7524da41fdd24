/// A rendered D2 diagram.
///
/// D2 emits an `<svg>` element wrapped in a second, outer `<svg>`. The artifact
/// keeps the inner markup as `body` and lifts the outer element's attributes
/// into scalar fields, so the wrapper can be rebuilt (or replaced) by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvgArtifact {
    pub body: String,
    /// Width attribute of the outer element; differs from the inner one when scaled.
    pub width: i32,
    pub height: i32,
    /// Unaffected by scaling.
    pub view_box: String,
    pub preserve_aspect_ratio: String,
}

impl SvgArtifact {
    /// Rebuild the outer `<svg>` element around the body.
    pub fn wrapped(&self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="{}" width="{}" height="{}" preserveAspectRatio="{}">{}</svg>"#,
            self.view_box, self.width, self.height, self.preserve_aspect_ratio, self.body,
        )
    }
}
