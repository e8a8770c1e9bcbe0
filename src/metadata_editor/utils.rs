//! Utilidades compartidas para generar rutas temporales.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Ruta temporal oculta en el mismo directorio que `path`, para que el
/// reemplazo final sea un `rename` dentro del mismo sistema de archivos.
pub fn generate_temp_filename(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let extension = path.extension().unwrap_or_default().to_string_lossy();

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!(".{stem}_temp_{}_{nanos}_{sequence}", std::process::id());

    if extension.is_empty() {
        parent.join(name)
    } else {
        parent.join(format!("{name}.{extension}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_names_stay_beside_the_original() {
        let first = generate_temp_filename(Path::new("/tmp/fotos/playa.jpg"));
        let second = generate_temp_filename(Path::new("/tmp/fotos/playa.jpg"));

        assert_eq!(first.parent(), Some(Path::new("/tmp/fotos")));
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_ne!(first, second);
    }
}
