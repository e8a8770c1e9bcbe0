//! Distribución de marcas de tiempo del sistema de archivos en un lote.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::record::{FileRecord, Timestamps};

/// Terna exacta (creación, modificación, acceso) usada como clave de conteo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimestampTriple {
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
}

impl TimestampTriple {
    fn present(&self) -> Vec<DateTime<Utc>> {
        [self.created_at, self.modified_at, self.accessed_at]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Al menos dos marcas presentes e idénticas hasta el nanosegundo.
    pub fn is_synchronized(&self) -> bool {
        let present = self.present();
        present.len() >= 2 && present.windows(2).all(|pair| pair[0] == pair[1])
    }
}

impl From<&Timestamps> for TimestampTriple {
    fn from(timestamps: &Timestamps) -> Self {
        Self {
            created_at: timestamps.created_at,
            modified_at: timestamps.modified_at,
            accessed_at: timestamps.accessed_at,
        }
    }
}

/// Conteo de archivos por terna. Se construye en una pasada de solo lectura
/// después de extraer todo el lote.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeerTimestamps {
    counts: HashMap<TimestampTriple, usize>,
    total: usize,
}

impl PeerTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        let mut peers = Self::new();
        for record in records {
            peers.add(&record.timestamps);
        }
        peers
    }

    pub fn add(&mut self, timestamps: &Timestamps) {
        *self.counts.entry(TimestampTriple::from(timestamps)).or_insert(0) += 1;
        self.total += 1;
    }

    /// Archivos del lote con exactamente la misma terna.
    pub fn count(&self, timestamps: &Timestamps) -> usize {
        self.counts
            .get(&TimestampTriple::from(timestamps))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
