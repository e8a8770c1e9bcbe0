mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use walkdir::WalkDir;

use filelens_forense::metadata::{map_for, render_locations, sink_for};
use filelens_forense::{
    BatchOptions, ForensicConfig, ForensicError, SanitizeOutcome, analyze_all, sanitize_file,
};

use cli::{AnalyzeArgs, Cli, Commands, Inputs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

/// Devuelve `false` si algún archivo no pudo procesarse.
fn run(cli: Cli) -> Result<bool, ForensicError> {
    let mut config = match &cli.config {
        Some(path) => ForensicConfig::load(path)?,
        None => ForensicConfig::default(),
    };
    if cli.workers.is_some() {
        config.workers = cli.workers;
    }

    match cli.command {
        Commands::Analyze(args) => run_analyze(args, &config),
        Commands::Sanitize(args) => Ok(run_sanitize(&args.inputs)),
    }
}

fn run_analyze(args: AnalyzeArgs, config: &ForensicConfig) -> Result<bool, ForensicError> {
    let paths = collect_paths(&args.inputs);
    let entries = analyze_all(&paths, &BatchOptions::from(config))?;

    match &args.output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path).map_err(|e| report_io(path, e))?);
            sink_for(args.format, writer).write_batch(&entries)?;
            info!(path = %path.display(), format = args.format.label(), "reporte escrito");
        }
        None => sink_for(args.format, io::stdout().lock()).write_batch(&entries)?,
    }

    if let Some(path) = &args.map {
        let file = BufWriter::new(File::create(path).map_err(|e| report_io(path, e))?);
        let mut map = map_for(path, file);
        let points = render_locations(map.as_mut(), entries.iter().filter_map(|e| e.record()))?;
        if points == 0 {
            warn!("ningún archivo del lote contiene ubicación; el mapa queda vacío");
        }
    }

    Ok(entries.iter().all(|entry| entry.outcome.is_ok()))
}

fn run_sanitize(inputs: &Inputs) -> bool {
    let mut all_clean = true;
    let mut stdout = io::stdout().lock();

    for path in collect_paths(inputs) {
        match sanitize_file(&path) {
            Ok(outcome) => all_clean &= print_outcome(&mut stdout, &outcome),
            Err(e) => {
                error!(path = %path.display(), "{e}");
                all_clean = false;
            }
        }
    }

    all_clean
}

/// Una línea JSON por archivo saneado. Devuelve `false` si no pudo escribirse.
fn print_outcome(out: &mut impl Write, outcome: &SanitizeOutcome) -> bool {
    let written = serde_json::to_string(outcome)
        .map_err(io::Error::from)
        .and_then(|line| writeln!(out, "{line}"));
    match written {
        Ok(()) => true,
        Err(e) => {
            error!(path = %outcome.path.display(), error = %e, "no se pudo escribir el resultado");
            false
        }
    }
}

fn report_io(path: &Path, source: io::Error) -> ForensicError {
    warn!(path = %path.display(), error = %source, "no se pudo crear el archivo de salida");
    ForensicError::Report(source.into())
}

/// Expande los directorios de entrada en la lista de archivos a procesar.
/// Sin `--recursive` solo se toman los archivos del primer nivel.
fn collect_paths(inputs: &Inputs) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in &inputs.paths {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let depth = if inputs.recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .max_depth(depth)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect();
        found.sort();
        paths.extend(found);
    }
    paths
}
