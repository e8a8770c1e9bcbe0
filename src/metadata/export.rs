//! Exportación del resultado de un lote en distintos formatos.
//!
//! Cada sink recibe las entradas en el orden del lote y escribe sobre
//! cualquier `io::Write`; la elección del destino queda en manos de quien llama.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::analysis::{AnalysisResult, Finding};
use crate::error::ReportError;
use crate::pipeline::BatchEntry;
use crate::record::FileRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
            ExportFormat::Txt => "TXT",
        }
    }
}

pub fn parse_export_format(input: &str) -> Result<ExportFormat, String> {
    match input.to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        "txt" | "text" => Ok(ExportFormat::Txt),
        _ => Err(format!("Formato de exportación no reconocido: `{input}`")),
    }
}

/// Destino de un lote ya analizado.
pub trait ReportSink {
    fn write_batch(&mut self, entries: &[BatchEntry]) -> Result<(), ReportError>;
}

/// Construye el sink del formato pedido sobre `writer`.
pub fn sink_for<'w, W: Write + 'w>(format: ExportFormat, writer: W) -> Box<dyn ReportSink + 'w> {
    match format {
        ExportFormat::Json => Box::new(JsonReport::new(writer)),
        ExportFormat::Csv => Box::new(CsvReport::new(writer)),
        ExportFormat::Txt => Box::new(TextReport::new(writer)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a BatchEntry> for JsonEntry<'a> {
    fn from(entry: &'a BatchEntry) -> Self {
        Self {
            path: &entry.path,
            record: entry.record(),
            analysis: entry.analysis(),
            error: entry.outcome.as_ref().err().map(ToString::to_string),
        }
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    files: Vec<JsonEntry<'a>>,
}

pub struct JsonReport<W: Write> {
    writer: W,
}

impl<W: Write> JsonReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn write_batch(&mut self, entries: &[BatchEntry]) -> Result<(), ReportError> {
        let document = JsonDocument {
            files: entries.iter().map(JsonEntry::from).collect(),
        };
        serde_json::to_writer_pretty(&mut self.writer, &document)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

const CSV_HEADER: [&str; 11] = [
    "path",
    "formatKind",
    "formatSubtype",
    "sha256",
    "riskLevel",
    "category",
    "severity",
    "message",
    "relatedFieldKeys",
    "partialErrors",
    "error",
];

/// Una fila por hallazgo; un archivo sin hallazgos o con error ocupa una fila.
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvReport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, ReportError> {
        self.writer
            .into_inner()
            .map_err(|error| ReportError::Io(error.into_error()))
    }

    fn write_finding(
        &mut self,
        record: &FileRecord,
        analysis: &AnalysisResult,
        finding: Option<&Finding>,
    ) -> Result<(), ReportError> {
        let partial = record
            .partial_errors
            .iter()
            .map(|error| error.group.name())
            .collect::<Vec<_>>()
            .join(";");
        let related = finding
            .map(|finding| {
                finding
                    .related_field_keys
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .unwrap_or_default();
        self.writer.write_record([
            record.path.display().to_string().as_str(),
            record.format_kind.label(),
            record.format_subtype.as_deref().unwrap_or(""),
            record.content_hashes.sha256.as_str(),
            analysis.risk_level.name(),
            finding.map_or("", |finding| finding.category.name()),
            finding.map_or("", |finding| finding.severity.name()),
            finding.map_or("", |finding| finding.message.as_str()),
            related.as_str(),
            partial.as_str(),
            "",
        ])?;
        Ok(())
    }
}

impl<W: Write> ReportSink for CsvReport<W> {
    fn write_batch(&mut self, entries: &[BatchEntry]) -> Result<(), ReportError> {
        self.writer.write_record(CSV_HEADER)?;
        for entry in entries {
            match &entry.outcome {
                Ok((record, analysis)) if analysis.findings.is_empty() => {
                    self.write_finding(record, analysis, None)?;
                }
                Ok((record, analysis)) => {
                    for finding in &analysis.findings {
                        self.write_finding(record, analysis, Some(finding))?;
                    }
                }
                Err(error) => {
                    let path = entry.path.display().to_string();
                    let message = error.to_string();
                    let mut row = [""; 11];
                    row[0] = path.as_str();
                    row[10] = message.as_str();
                    self.writer.write_record(row)?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Reporte legible, una sección por archivo.
pub struct TextReport<W: Write> {
    writer: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn write_batch(&mut self, entries: &[BatchEntry]) -> Result<(), ReportError> {
        let mut output = String::new();
        output.push_str("Reporte forense de metadata\n");
        output.push_str("===========================\n\n");

        for entry in entries {
            let title = entry.path.display().to_string();
            output.push_str(&title);
            output.push('\n');
            output.push_str(&"-".repeat(title.chars().count()));
            output.push('\n');

            match &entry.outcome {
                Ok((record, analysis)) => append_text_entry(&mut output, record, analysis),
                Err(error) => output.push_str(&format!("Error: {error}\n")),
            }
            output.push('\n');
        }

        self.writer.write_all(output.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

fn append_text_entry(output: &mut String, record: &FileRecord, analysis: &AnalysisResult) {
    let format = match &record.format_subtype {
        Some(subtype) => format!("{} ({subtype})", record.format_kind.label()),
        None => record.format_kind.label().to_string(),
    };
    output.push_str(&format!("- Formato: {format}\n"));
    output.push_str(&format!("- Tamaño: {} bytes\n", record.size_bytes));
    output.push_str(&format!("- MD5: {}\n", record.content_hashes.md5));
    output.push_str(&format!("- SHA-256: {}\n", record.content_hashes.sha256));
    output.push_str(&format!("- Nivel de riesgo: {}\n", analysis.risk_level));

    if record.fields.is_empty() {
        output.push_str("Campos: (Sin datos)\n");
    } else {
        output.push_str("Campos:\n");
        for (key, value) in &record.fields {
            output.push_str(&format!("  {key}: {value}\n"));
        }
    }

    for error in &record.partial_errors {
        output.push_str(&format!("Nota: grupo `{}` ilegible ({})\n", error.group, error.reason));
    }

    if analysis.findings.is_empty() {
        output.push_str("Hallazgos: ninguno\n");
    } else {
        output.push_str("Hallazgos:\n");
        for finding in &analysis.findings {
            output.push_str(&format!(
                "  [{}] {}: {}\n",
                finding.severity,
                finding.category.label(),
                finding.message
            ));
        }
    }

    if !analysis.recommendations.is_empty() {
        output.push_str("Recomendaciones:\n");
        for advice in &analysis.recommendations {
            output.push_str(&format!("  - {advice}\n"));
        }
    }
}
