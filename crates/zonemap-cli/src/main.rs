use futures::executor::block_on;
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonemap::render::geojson::FeatureCollection;
use zonemap::render::{
    MapView, RenderOptions, RenderedLayer, load_collection, render_layer, styled_collection,
};
use zonemap::{
    CycleOutcome, Engine, FileSource, Refresher, Resolution, ZoneMapConfig, ZoneStatus,
    candidate_variants,
};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    ZoneMap(zonemap::Error),
    Render(zonemap_render::Error),
    Json(serde_json::Error),
    Unresolved(Vec<String>),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::ZoneMap(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Unresolved(ids) => {
                write!(f, "No zone matches identifier(s): {}", ids.join(", "))
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<zonemap::Error> for CliError {
    fn from(value: zonemap::Error) -> Self {
        Self::ZoneMap(value)
    }
}

impl From<zonemap_render::Error> for CliError {
    fn from(value: zonemap_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Parse,
    Registry,
    Resolve,
    Render,
    Watch,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    positional: Vec<String>,
    feed: Option<String>,
    polygons: Option<String>,
    config: Option<String>,
    format: Option<String>,
    delimiter: Option<String>,
    key_property: Option<String>,
    out: Option<String>,
    pretty: bool,
    summary: bool,
    interval_secs: Option<u64>,
    cycles: Option<u64>,
}

fn usage() -> &'static str {
    "zonemap-cli\n\
\n\
USAGE:\n\
  zonemap-cli [parse] [--format auto|csv|tsv|json] [--delimiter <c>] [--config <path>] [--pretty] [<feed>|-]\n\
  zonemap-cli registry [--format ...] [--delimiter <c>] [--config <path>] [--pretty] [<feed>|-]\n\
  zonemap-cli resolve --feed <path> [--config <path>] [--pretty] <zone-id>...\n\
  zonemap-cli render --polygons <path> [--feed <path>|-] [--key <property>] [--config <path>] [--summary] [--out <path>] [--pretty]\n\
  zonemap-cli watch --feed <path> [--polygons <path> --out <path>] [--interval <secs>] [--cycles <n>] [--config <path>]\n\
\n\
NOTES:\n\
  - If <feed> is omitted or '-', the feed is read from stdin.\n\
  - parse prints the normalized table; registry prints the zone registry and build report.\n\
  - resolve exits with status 3 when any identifier matches no zone.\n\
  - render prints the styled GeoJSON layer to stdout by default; use --out to write a file.\n\
  - watch re-reads the feed every interval and prints one JSON line per refresh cycle.\n\
  - Logging goes to stderr; set RUST_LOG (default: warn).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    let mut saw_command = false;
    while let Some(a) = it.next() {
        let mut value = || it.next().cloned().ok_or(CliError::Usage(usage()));
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "parse" | "registry" | "resolve" | "render" | "watch" if !saw_command => {
                args.command = match a.as_str() {
                    "registry" => Command::Registry,
                    "resolve" => Command::Resolve,
                    "render" => Command::Render,
                    "watch" => Command::Watch,
                    _ => Command::Parse,
                };
            }
            "--feed" => args.feed = Some(value()?),
            "--polygons" => args.polygons = Some(value()?),
            "--config" => args.config = Some(value()?),
            "--format" => args.format = Some(value()?),
            "--delimiter" => args.delimiter = Some(value()?),
            "--key" => args.key_property = Some(value()?),
            "--out" => args.out = Some(value()?),
            "--pretty" => args.pretty = true,
            "--summary" => args.summary = true,
            "--interval" => {
                args.interval_secs =
                    Some(value()?.parse::<u64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--cycles" => {
                let cycles = value()?.parse::<u64>().map_err(|_| CliError::Usage(usage()))?;
                if cycles == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.cycles = Some(cycles);
            }
            "--" => {
                args.positional.extend(it.by_ref().cloned());
            }
            "-" => args.positional.push(a.clone()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            positional => args.positional.push(positional.to_string()),
        }
        saw_command = true;
    }

    match args.command {
        Command::Parse | Command::Registry if args.positional.len() > 1 => {
            Err(CliError::Usage(usage()))
        }
        Command::Resolve if args.feed.is_none() || args.positional.is_empty() => {
            Err(CliError::Usage(usage()))
        }
        Command::Render if args.polygons.is_none() || !args.positional.is_empty() => {
            Err(CliError::Usage(usage()))
        }
        Command::Watch
            if args.feed.is_none()
                || !args.positional.is_empty()
                || args.polygons.is_some() != args.out.is_some() =>
        {
            Err(CliError::Usage(usage()))
        }
        _ => Ok(args),
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            println!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn build_engine(args: &Args) -> Result<Engine, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => ZoneMapConfig::load(std::path::Path::new(path))?,
        None => ZoneMapConfig::defaults(),
    };
    if let Some(format) = &args.format {
        config.set_value("feed.format", serde_json::json!(format));
    }
    if let Some(delimiter) = &args.delimiter {
        config.set_value("feed.delimiter", serde_json::json!(delimiter));
    }
    if let Some(key) = &args.key_property {
        config.set_value("polygons.keyProperty", serde_json::json!(key));
    }
    Ok(Engine::from_config(config)?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOut<'a> {
    id: &'a str,
    candidates: Vec<String>,
    resolution: Option<Resolution>,
    status: Option<&'a ZoneStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CycleOut {
    cycle: u64,
    generation: u64,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    zones: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    newest: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn run(args: Args) -> Result<(), CliError> {
    let engine = build_engine(&args)?;

    match args.command {
        Command::Parse => {
            let text = read_input(args.positional.first().map(String::as_str))?;
            let table = block_on(engine.parse_feed(&text))?;
            write_json(&table, args.pretty)
        }
        Command::Registry => {
            let text = read_input(args.positional.first().map(String::as_str))?;
            let registry = block_on(engine.build_registry(&text))?;
            write_json(&registry, args.pretty)
        }
        Command::Resolve => {
            let text = read_input(args.feed.as_deref())?;
            let registry = block_on(engine.build_registry(&text))?;
            let mut unresolved = Vec::new();
            let results: Vec<ResolveOut<'_>> = args
                .positional
                .iter()
                .map(|id| {
                    let hit = registry.lookup(Some(id.as_str()));
                    if hit.is_none() {
                        unresolved.push(id.clone());
                    }
                    let (resolution, status) = match hit {
                        Some((resolution, status)) => (Some(resolution), Some(status)),
                        None => (None, None),
                    };
                    ResolveOut {
                        id: id.as_str(),
                        candidates: candidate_variants(Some(id.as_str())).into_iter().collect(),
                        resolution,
                        status,
                    }
                })
                .collect();
            write_json(&results, args.pretty)?;
            if unresolved.is_empty() {
                Ok(())
            } else {
                Err(CliError::Unresolved(unresolved))
            }
        }
        Command::Render => {
            let polygons = std::fs::read_to_string(args.polygons.as_deref().unwrap_or_default())?;
            let collection = load_collection(&polygons)?;
            let feed = read_input(args.feed.as_deref())?;
            let registry = block_on(engine.build_registry(&feed))?;
            let layer = render_layer(
                &collection,
                Some(&registry),
                &RenderOptions::from_engine(&engine),
            );
            if args.summary {
                return write_json(&layer.summary, args.pretty);
            }
            let styled = styled_collection(&collection, &layer)?;
            let text = zonemap::render::to_json_string(&styled, args.pretty)?;
            write_text(&text, args.out.as_deref())
        }
        Command::Watch => watch(engine, &args),
    }
}

fn watch(engine: Engine, args: &Args) -> Result<(), CliError> {
    let interval = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| engine.refresh_interval());

    let mut view = MapView::new(RenderOptions::from_engine(&engine));
    if let Some(path) = args.polygons.as_deref() {
        view.set_polygons(load_collection(&std::fs::read_to_string(path)?)?);
    }

    let feed = args.feed.clone().unwrap_or_default();
    let refresher = Refresher::new(engine, FileSource::new(feed));
    let mut cycle = 0u64;
    loop {
        cycle += 1;
        let line = match block_on(refresher.refresh()) {
            CycleOutcome::Published(registry) => {
                let zones = registry.len();
                let generation = registry.generation();
                view.set_registry(Arc::clone(&registry));
                let mut matched = None;
                let mut error = None;
                if let (Some(polygons), Some(layer), Some(out)) =
                    (view.polygons(), view.layer(), args.out.as_deref())
                {
                    match write_layer(polygons, layer, out) {
                        Ok(()) => matched = Some(layer.summary.matched),
                        Err(err) => {
                            tracing::warn!(
                                cycle,
                                generation,
                                out,
                                error = %err,
                                "failed to write styled layer"
                            );
                            error = Some(err.to_string());
                        }
                    }
                }
                CycleOut {
                    cycle,
                    generation,
                    outcome: if error.is_some() { "failed" } else { "published" },
                    zones: Some(zones),
                    matched,
                    newest: None,
                    error,
                }
            }
            CycleOutcome::Superseded { generation, newest } => CycleOut {
                cycle,
                generation,
                outcome: "superseded",
                zones: None,
                matched: None,
                newest: Some(newest),
                error: None,
            },
            CycleOutcome::Failed { generation, error } => CycleOut {
                cycle,
                generation,
                outcome: "failed",
                zones: None,
                matched: None,
                newest: None,
                error: Some(error.to_string()),
            },
        };
        write_json(&line, false)?;
        std::io::stdout().flush()?;

        if args.cycles.is_some_and(|n| cycle >= n) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn write_layer(
    polygons: &FeatureCollection,
    layer: &RenderedLayer,
    out: &str,
) -> Result<(), CliError> {
    let styled = styled_collection(polygons, layer)?;
    write_text(&zonemap::render::to_json_string(&styled, false)?, Some(out))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Unresolved(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
