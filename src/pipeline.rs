//! Procesamiento por lotes: extracción en paralelo, agregación de marcas de
//! tiempo del lote y pasada de reglas por archivo.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::analysis::{AnalysisResult, Analyzer, PeerTimestamps};
use crate::config::{AnalyzerConfig, ForensicConfig};
use crate::error::{ForensicError, Result};
use crate::metadata::extract;
use crate::record::FileRecord;

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Hilos del grupo; `None` usa el paralelismo disponible.
    pub workers: Option<usize>,
    pub analyzer: AnalyzerConfig,
    /// Bandera cooperativa de parada, consultada antes y después de cada archivo.
    pub stop: Option<Arc<AtomicBool>>,
}

impl From<&ForensicConfig> for BatchOptions {
    fn from(config: &ForensicConfig) -> Self {
        Self {
            workers: config.workers,
            analyzer: config.analyzer.clone(),
            stop: None,
        }
    }
}

/// Resultado de un archivo del lote, en la misma posición que su ruta de entrada.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub outcome: std::result::Result<(FileRecord, AnalysisResult), ForensicError>,
}

impl BatchEntry {
    pub fn record(&self) -> Option<&FileRecord> {
        self.outcome.as_ref().ok().map(|(record, _)| record)
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.outcome.as_ref().ok().map(|(_, analysis)| analysis)
    }
}

fn is_stopped(stop: Option<&AtomicBool>) -> bool {
    stop.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn extract_one(path: &Path, stop: Option<&AtomicBool>) -> Result<FileRecord> {
    let cancelled = || ForensicError::Cancelled {
        path: path.to_path_buf(),
    };
    if is_stopped(stop) {
        return Err(cancelled());
    }
    let record = extract(path)?;
    // Un archivo terminado después de la señal de parada se descarta completo.
    if is_stopped(stop) {
        return Err(cancelled());
    }
    Ok(record)
}

/// Analiza `paths` y devuelve una entrada por ruta, en el orden de entrada.
///
/// Solo falla si no se puede crear el grupo de hilos; los errores de cada
/// archivo quedan en su `BatchEntry`.
pub fn analyze_all<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &BatchOptions,
) -> Result<Vec<BatchEntry>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.unwrap_or(0))
        .build()?;
    let stop = options.stop.as_deref();
    let analyzer = Analyzer::new(options.analyzer.clone());

    info!(files = paths.len(), threads = pool.current_num_threads(), "iniciando lote");

    let extracted: Vec<Result<FileRecord>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| extract_one(path.as_ref(), stop))
            .collect()
    });

    let peers =
        PeerTimestamps::from_records(extracted.iter().filter_map(|entry| entry.as_ref().ok()));

    let entries: Vec<BatchEntry> = pool.install(|| {
        paths
            .par_iter()
            .zip(extracted.into_par_iter())
            .map(|(path, extraction)| {
                let outcome = extraction.and_then(|record| {
                    let analysis = analyzer.analyze(&record, Some(&peers))?;
                    Ok((record, analysis))
                });
                if let Err(error) = &outcome {
                    warn!(path = %path.as_ref().display(), %error, "archivo sin análisis");
                }
                BatchEntry {
                    path: path.as_ref().to_path_buf(),
                    outcome,
                }
            })
            .collect()
    });

    let failed = entries.iter().filter(|entry| entry.outcome.is_err()).count();
    info!(files = entries.len(), failed, "lote completado");
    Ok(entries)
}
