use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::application::error::DiagramError;

/// Load diagram source by file name, trying the page's own directory before
/// the shared assets directory.
pub fn load_spec_file(
    name: &str,
    page_dir: Option<&Path>,
    assets_dir: &Path,
) -> Result<String, DiagramError> {
    let searched: Vec<PathBuf> = page_dir
        .into_iter()
        .chain(std::iter::once(assets_dir))
        .map(|dir| dir.join(name))
        .collect();

    for path in &searched {
        match fs::read_to_string(path) {
            Ok(source) => {
                debug!(
                    target = "application::source",
                    op = "source::load_spec_file",
                    result = "found",
                    path = %path.display(),
                    source_bytes = source.len(),
                    "Loaded diagram source"
                );
                return Ok(source);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(DiagramError::SpecFileRead {
                    path: path.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    Err(DiagramError::SpecFileNotFound {
        name: name.to_string(),
        searched,
    })
}
