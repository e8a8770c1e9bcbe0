//! Argumentos de línea de comandos.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use filelens_forense::metadata::{ExportFormat, parse_export_format};

/// Análisis forense de metadata de archivos.
///
/// Detecta marcas de tiempo imposibles, datos personales embebidos,
/// metadata ausente y ubicaciones poco plausibles.
#[derive(Parser, Debug)]
#[command(name = "filelens-forense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Archivo JSON de configuración del analizador
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hilos de extracción (por defecto uno por núcleo)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Aumenta el detalle de los registros (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extrae y analiza la metadata de archivos o directorios
    Analyze(AnalyzeArgs),

    /// Elimina la metadata sensible en el sitio
    Sanitize(SanitizeArgs),
}

#[derive(Args, Debug)]
pub struct Inputs {
    /// Archivos o directorios a procesar
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recorre los directorios de forma recursiva
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Formato del reporte: json, csv o txt
    #[arg(short, long, default_value = "json", value_parser = parse_export_format)]
    pub format: ExportFormat,

    /// Archivo de salida del reporte (por defecto, salida estándar)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Escribe un mapa con las posiciones embebidas (KML si la ruta acaba en `.kml`, si no GeoJSON)
    #[arg(long)]
    pub map: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SanitizeArgs {
    #[command(flatten)]
    pub inputs: Inputs,
}
