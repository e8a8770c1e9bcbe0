//! Clasificación del formato por firma de contenido.
//!
//! La extensión del archivo nunca se consulta: un JPEG renombrado a `.txt`
//! sigue siendo una imagen.

use std::io::{self, Read, Seek, SeekFrom};

use infer::MatcherType;
use serde::Serialize;

use crate::record::FormatKind;

/// Bytes de cabecera que se leen para comparar firmas.
pub const PROBE_LEN: usize = 8192;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatProbe {
    pub kind: FormatKind,
    pub subtype: Option<String>,
    pub mime_type: Option<String>,
}

impl FormatProbe {
    fn new(kind: FormatKind, subtype: &str, mime_type: &str) -> Self {
        Self {
            kind,
            subtype: Some(subtype.to_string()),
            mime_type: Some(mime_type.to_string()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: FormatKind::Unknown,
            subtype: None,
            mime_type: None,
        }
    }

    pub fn subtype(&self) -> &str {
        self.subtype.as_deref().unwrap_or("")
    }
}

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Clasifica el contenido y deja el lector de nuevo en el inicio.
pub fn probe_reader<R: Read + Seek + ?Sized>(reader: &mut R) -> io::Result<FormatProbe> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = Vec::with_capacity(PROBE_LEN);
    (&mut *reader).take(PROBE_LEN as u64).read_to_end(&mut header)?;
    reader.seek(SeekFrom::Start(0))?;

    let mut probe = probe_bytes(&header);
    let is_zip = probe.mime_type.as_deref() == Some("application/zip");
    if is_zip || probe.kind == FormatKind::OfficeDocument {
        if let Some(package) = inspect_ooxml_package(reader) {
            probe = package;
        }
        reader.seek(SeekFrom::Start(0))?;
    }
    Ok(probe)
}

/// Clasificación solo por cabecera; los paquetes OOXML que `infer` no
/// distingue quedan como `application/zip` desconocido.
pub fn probe_bytes(header: &[u8]) -> FormatProbe {
    let Some(kind) = infer::get(header) else {
        return FormatProbe::unknown();
    };
    let mime = kind.mime_type();
    let extension = kind.extension();

    match (kind.matcher_type(), mime) {
        (_, "application/pdf") => FormatProbe::new(FormatKind::PdfDocument, "pdf", mime),
        (_, DOCX_MIME) => FormatProbe::new(FormatKind::OfficeDocument, "docx", mime),
        (_, XLSX_MIME) => FormatProbe::new(FormatKind::OfficeDocument, "xlsx", mime),
        (_, PPTX_MIME) => FormatProbe::new(FormatKind::OfficeDocument, "pptx", mime),
        (_, "application/msword") => FormatProbe::new(FormatKind::OfficeDocument, "doc", mime),
        (_, "application/vnd.ms-excel") => {
            FormatProbe::new(FormatKind::OfficeDocument, "xls", mime)
        }
        (_, "application/vnd.ms-powerpoint") => {
            FormatProbe::new(FormatKind::OfficeDocument, "ppt", mime)
        }
        (MatcherType::Image, _) => {
            FormatProbe::new(FormatKind::Image, image_subtype(extension), mime)
        }
        (MatcherType::Audio | MatcherType::Video, _) => {
            FormatProbe::new(FormatKind::MediaFile, extension, mime)
        }
        _ => FormatProbe {
            kind: FormatKind::Unknown,
            subtype: Some(extension.to_string()),
            mime_type: Some(mime.to_string()),
        },
    }
}

fn image_subtype(extension: &str) -> &str {
    match extension {
        "jpg" => "jpeg",
        "tif" => "tiff",
        other => other,
    }
}

fn inspect_ooxml_package<R: Read + Seek + ?Sized>(reader: &mut R) -> Option<FormatProbe> {
    reader.seek(SeekFrom::Start(0)).ok()?;
    let archive = zip::ZipArchive::new(&mut *reader).ok()?;
    let mut has_content_types = false;
    let mut package = None;
    for name in archive.file_names() {
        if name == "[Content_Types].xml" {
            has_content_types = true;
        } else if package.is_none() {
            package = match name.split('/').next() {
                Some("word") => Some(("docx", DOCX_MIME)),
                Some("xl") => Some(("xlsx", XLSX_MIME)),
                Some("ppt") => Some(("pptx", PPTX_MIME)),
                _ => None,
            };
        }
    }
    let (subtype, mime) = package.filter(|_| has_content_types)?;
    Some(FormatProbe::new(FormatKind::OfficeDocument, subtype, mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn classifies_by_signature() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
        let probe = probe_bytes(&jpeg);
        assert_eq!(probe.kind, FormatKind::Image);
        assert_eq!(probe.subtype.as_deref(), Some("jpeg"));

        let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
        assert_eq!(probe_bytes(pdf).kind, FormatKind::PdfDocument);

        let mp3 = b"ID3\x04\x00\x00\x00\x00\x00\x00";
        let probe = probe_bytes(mp3);
        assert_eq!(probe.kind, FormatKind::MediaFile);
        assert_eq!(probe.subtype.as_deref(), Some("mp3"));
    }

    #[test]
    fn plain_text_is_unknown() {
        let probe = probe_bytes(b"solo texto plano sin firma");
        assert_eq!(probe.kind, FormatKind::Unknown);
        assert_eq!(probe.mime_type, None);
    }

    #[test]
    fn zip_with_word_part_is_docx() -> Result<(), Box<dyn std::error::Error>> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::<'_, ()>::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("[Content_Types].xml", options)?;
            std::io::Write::write_all(&mut writer, b"<Types/>")?;
            writer.start_file("word/document.xml", options)?;
            std::io::Write::write_all(&mut writer, b"<document/>")?;
            writer.finish()?;
        }

        let probe = probe_reader(&mut buffer)?;
        assert_eq!(probe.kind, FormatKind::OfficeDocument);
        assert_eq!(probe.subtype.as_deref(), Some("docx"));
        assert_eq!(buffer.position(), 0);
        Ok(())
    }
}
