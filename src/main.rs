use std::{
    io::{self, Write},
    process,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Instant,
};

use diagram_cache::{
    application::{
        Diagram, Diagrams, error::AppError, error::DiagramError, load_spec_file,
        options::overrides_from_map,
    },
    config::{self, KeyArgs, RenderArgs, SourceArgs, options_map},
    domain::themes::{DARK_CATALOG, LIGHT_CATALOG, theme_names},
    infra::{error::InfraError, telemetry},
};
use serde_json::json;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(&settings, args),
        config::Command::Key(args) => run_key(&settings, args),
        config::Command::Themes => run_themes(),
    }
}

fn run_render(settings: &config::Settings, args: RenderArgs) -> Result<(), AppError> {
    let diagrams = Diagrams::from_settings(settings)?;
    let call = overrides_from_map(&options_map(&args.options))?;
    let concurrency = args.concurrency.clamp(1, 32).min(args.files.len());
    let started_at = Instant::now();

    info!(
        target = "diagram_cache::render",
        files = args.files.len(),
        concurrency,
        cache_dir = %settings.cache.directory.display(),
        "Starting render"
    );

    let next = AtomicUsize::new(0);
    let (next, files, source_args, diagrams_ref, call) =
        (&next, &args.files, &args.source, &diagrams, &call);
    let batches = thread::scope(|scope| {
        let workers: Vec<_> = (0..concurrency)
            .map(|_| {
                scope.spawn(move || {
                    let mut rendered = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(name) = files.get(index) else {
                            break;
                        };
                        let result = load_spec_file(
                            name,
                            source_args.page_dir.as_deref(),
                            &source_args.assets_dir,
                        )
                        .and_then(|source| diagrams_ref.render_d2(&source, call));
                        rendered.push((index, result));
                    }
                    rendered
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .map_err(|_| AppError::unexpected("render worker panicked"))
            })
            .collect::<Result<Vec<_>, AppError>>()
    })?;
    let mut results: Vec<(usize, Result<Diagram, DiagramError>)> =
        batches.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);

    let mut stdout = io::stdout().lock();
    let mut first_error = None;
    let mut failed = 0usize;
    for (index, result) in results {
        match result {
            Ok(diagram) => {
                let svg = if args.inner {
                    diagram.inner().to_string()
                } else {
                    diagram.wrapped()
                };
                writeln!(stdout, "{svg}").map_err(InfraError::from)?;
            }
            Err(err) => {
                failed += 1;
                error!(
                    target = "diagram_cache::render",
                    file = %args.files[index],
                    error = %err,
                    "Diagram failed to render"
                );
                first_error.get_or_insert(err);
            }
        }
    }

    info!(
        target = "diagram_cache::render",
        files = args.files.len(),
        failed,
        memory_entries = diagrams.cache().memory().len(),
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "Render completed"
    );

    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn run_key(settings: &config::Settings, args: KeyArgs) -> Result<(), AppError> {
    let diagrams = Diagrams::from_settings(settings)?;
    let KeyArgs {
        file,
        source: SourceArgs {
            page_dir,
            assets_dir,
        },
        options,
    } = args;

    let source = load_spec_file(&file, page_dir.as_deref(), &assets_dir)?;
    let call = overrides_from_map(&options_map(&options))?;
    let key = diagrams.cache_key(&source, &call)?;

    writeln!(io::stdout().lock(), "{key}").map_err(InfraError::from)?;
    Ok(())
}

fn run_themes() -> Result<(), AppError> {
    let catalogs = json!({
        "light": theme_names(LIGHT_CATALOG),
        "dark": theme_names(DARK_CATALOG),
    });
    let rendered = serde_json::to_string_pretty(&catalogs).map_err(InfraError::from)?;
    writeln!(io::stdout().lock(), "{rendered}").map_err(InfraError::from)?;
    Ok(())
}
