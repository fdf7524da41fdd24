use std::{
    ffi::OsString,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::domain::{
    artifact::SvgArtifact,
    options::{DiagramOptions, LayoutEngine},
    themes::theme_id,
};

use super::svg::{minify_svg, split_outer_svg};
use super::types::{DiagramRenderer, RenderError};

/// Renders diagrams by shelling out to the `d2` executable with a fixed layout engine.
#[derive(Debug, Clone)]
pub struct D2CliRenderer {
    cli_path: PathBuf,
    layout: LayoutEngine,
}

impl D2CliRenderer {
    pub fn new(cli_path: impl Into<PathBuf>, layout: LayoutEngine) -> Self {
        Self {
            cli_path: cli_path.into(),
            layout,
        }
    }

    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    pub fn layout(&self) -> LayoutEngine {
        self.layout
    }

    fn arguments(&self, options: &DiagramOptions) -> Result<Vec<OsString>, RenderError> {
        let light = theme_id(&options.light_theme)?;
        let dark = theme_id(&options.dark_theme)?;

        let mut args: Vec<OsString> = vec![
            format!("--layout={}", self.layout).into(),
            format!("--theme={light}").into(),
            format!("--dark-theme={dark}").into(),
            format!("--pad={}", options.padding).into(),
            format!("--scale={}", options.scale).into(),
            "--omit-version".into(),
            "--no-xml-tag".into(),
        ];
        if !options.salt.is_empty() {
            args.push(format!("--salt={}", options.salt).into());
        }
        if options.sketch {
            args.push("--sketch".into());
        }
        if options.center {
            args.push("--center".into());
        }
        Ok(args)
    }
}

impl DiagramRenderer for D2CliRenderer {
    fn render(&self, source: &str, options: &DiagramOptions) -> Result<SvgArtifact, RenderError> {
        let started_at = Instant::now();
        let args = self.arguments(options)?;

        let mut input_file = tempfile::Builder::new()
            .suffix(".d2")
            .tempfile()
            .map_err(RenderError::io)?;
        input_file
            .write_all(source.as_bytes())
            .map_err(RenderError::io)?;
        input_file.flush().map_err(RenderError::io)?;

        let output_file: NamedTempFile = tempfile::Builder::new()
            .suffix(".svg")
            .tempfile()
            .map_err(RenderError::io)?;

        let cli_started_at = Instant::now();
        let output = Command::new(&self.cli_path)
            .args(&args)
            .arg(input_file.path())
            .arg(output_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "application::render::d2",
                    op = "d2::render",
                    result = "error",
                    layout = %self.layout,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_cli",
                    error = %err,
                    "Failed to spawn d2 CLI"
                );
                if err.kind() == ErrorKind::NotFound {
                    RenderError::NotFound {
                        path: self.cli_path.display().to_string(),
                        message: err.to_string(),
                    }
                } else {
                    RenderError::io(err)
                }
            })?;

        if !output.status.success() {
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = "application::render::d2",
                op = "d2::render",
                result = "error",
                layout = %self.layout,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                cli_elapsed_ms = cli_started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                error_code = "d2_cli",
                stderr = %stderr,
                "d2 CLI invocation failed"
            );
            return Err(RenderError::Cli { exit_code, stderr });
        }

        let svg = fs::read_to_string(output_file.path()).map_err(|err| {
            warn!(
                target = "application::render::d2",
                op = "d2::render",
                result = "error",
                layout = %self.layout,
                error_code = "output_read",
                error = %err,
                "Failed to read SVG written by d2 CLI"
            );
            RenderError::io(err)
        })?;

        let mut artifact = split_outer_svg(&svg, options.preserve_aspect_ratio())?;
        if options.minify {
            artifact.body = minify_svg(&artifact.body)?;
        }

        info!(
            target = "application::render::d2",
            op = "d2::render",
            result = "rendered",
            layout = %self.layout,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            cli_elapsed_ms = cli_started_at.elapsed().as_millis() as u64,
            svg_bytes = svg.len(),
            body_bytes = artifact.body.len(),
            "Diagram rendered via d2 CLI"
        );

        Ok(artifact)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn make_executable(path: &Path) {
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("set perms");
    }

    fn fake_d2(dir: &TempDir, args_path: &Path) -> PathBuf {
        let script_path = dir.path().join("fake-d2");
        // The last two positional arguments are the input and output paths.
        let script = format!(
            r#"#!/bin/sh
set -eu
echo "$@" > "{args_file}"
for last; do :; done
out="$last"
case "$out" in
  *.svg) ;;
  *)
    echo "invalid output suffix: $out" >&2
    exit 9
    ;;
esac
cat <<'SVG' > "$out"
<svg xmlns="http://www.w3.org/2000/svg" preserveAspectRatio="xMinYMin meet" viewBox="0 0 120 80" width="120" height="80">
  <!-- generated -->
  <svg class="d2"><g><text>x</text></g></svg>
</svg>
SVG
"#,
            args_file = args_path.display()
        );
        fs::write(&script_path, script).expect("write script");
        make_executable(&script_path);
        script_path
    }

    #[test]
    fn renders_and_minifies_with_valid_cli() {
        let dir = TempDir::new().expect("temp dir");
        let args_path = dir.path().join("args.log");
        let renderer = D2CliRenderer::new(fake_d2(&dir, &args_path), LayoutEngine::Elk);

        let options = DiagramOptions {
            dark_theme: "dark mauve".to_string(),
            padding: 12,
            sketch: true,
            salt: "second".to_string(),
            ..Default::default()
        };
        let artifact = renderer.render("x -> y", &options).expect("svg rendered");

        assert_eq!((artifact.width, artifact.height), (120, 80));
        assert_eq!(artifact.view_box, "0 0 120 80");
        assert_eq!(artifact.body, r#"<svg class="d2"><g><text>x</text></g></svg>"#);

        let args = fs::read_to_string(&args_path).expect("read args");
        for expected in [
            "--layout=elk",
            "--theme=0",
            "--dark-theme=200",
            "--pad=12",
            "--scale=1",
            "--salt=second",
            "--sketch",
            "--omit-version",
            "--no-xml-tag",
        ] {
            assert!(args.contains(expected), "CLI args missing {expected}: {args}");
        }
        assert!(!args.contains("--center"), "unexpected --center: {args}");
    }

    #[test]
    fn keeps_body_verbatim_without_minify() {
        let dir = TempDir::new().expect("temp dir");
        let args_path = dir.path().join("args.log");
        let renderer = D2CliRenderer::new(fake_d2(&dir, &args_path), LayoutEngine::Dagre);

        let options = DiagramOptions {
            minify: false,
            ..Default::default()
        };
        let artifact = renderer.render("x -> y", &options).expect("svg rendered");
        assert!(artifact.body.contains("<!-- generated -->"));
    }

    #[test]
    fn surfaces_cli_errors() {
        let dir = TempDir::new().expect("temp dir");
        let script_path = dir.path().join("fake-d2");
        fs::write(
            &script_path,
            r#"#!/bin/sh
echo "err: failed to compile x.d2: unexpected text" >&2
exit 42
"#,
        )
        .expect("write script");
        make_executable(&script_path);

        let renderer = D2CliRenderer::new(script_path, LayoutEngine::Dagre);
        let err = renderer
            .render("x ->", &DiagramOptions::default())
            .expect_err("expected cli failure");
        match err {
            RenderError::Cli { exit_code, stderr } => {
                assert_eq!(exit_code, Some(42));
                assert!(
                    stderr.contains("failed to compile"),
                    "stderr did not propagate: {stderr}"
                );
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn missing_cli_is_reported() {
        let renderer = D2CliRenderer::new("/nonexistent/d2", LayoutEngine::Dagre);
        let err = renderer
            .render("x -> y", &DiagramOptions::default())
            .expect_err("missing cli");
        assert!(matches!(err, RenderError::NotFound { .. }), "{err:?}");
    }

    #[test]
    fn unknown_theme_fails_before_spawning() {
        let renderer = D2CliRenderer::new("/nonexistent/d2", LayoutEngine::Dagre);
        let options = DiagramOptions {
            light_theme: "Arthur Dent".to_string(),
            ..Default::default()
        };
        let err = renderer.render("x -> y", &options).expect_err("unknown theme");
        assert_eq!(err.to_string(), "theme does not exist: Arthur Dent");
    }
}
