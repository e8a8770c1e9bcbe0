//! Extracción de metadata en PDFs mediante lectura del diccionario Info.

use std::io::Read;

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::dates::parse_pdf_date;
use super::{ExtractedFields, FieldExtractor, SeekRead, decode_utf16};
use crate::probe::FormatProbe;
use crate::record::{FieldGroup, FormatKind, keys};

const INFO_TEXT_FIELDS: [(&[u8], &str); 7] = [
    (b"Title", keys::TITLE),
    (b"Author", keys::AUTHOR),
    (b"Subject", keys::SUBJECT),
    (b"Keywords", keys::KEYWORDS),
    (b"Creator", "pdf.creator"),
    (b"Producer", keys::SOFTWARE),
    (b"Company", keys::ORGANIZATION),
];

const INFO_DATE_FIELDS: [(&[u8], &str); 2] = [
    (b"CreationDate", keys::EMBEDDED_CREATED_AT),
    (b"ModDate", keys::EMBEDDED_MODIFIED_AT),
];

pub struct PdfExtractor;

impl FieldExtractor for PdfExtractor {
    fn family(&self) -> FormatKind {
        FormatKind::PdfDocument
    }

    fn extract_fields(&self, reader: &mut dyn SeekRead, _probe: &FormatProbe) -> ExtractedFields {
        let mut output = ExtractedFields::default();
        let mut bytes = Vec::new();
        if let Err(error) = reader.read_to_end(&mut bytes) {
            output.partial(FieldGroup::Descriptive, format!("No se pudo leer el PDF: {error}"));
            return output;
        }

        let doc = match Document::load_mem(&bytes) {
            Ok(doc) => doc,
            Err(error) => {
                debug!(%error, "estructura PDF ilegible");
                let reason = format!("estructura PDF ilegible: {error}");
                output.partial(FieldGroup::Descriptive, reason.clone());
                output.partial(FieldGroup::EmbeddedDates, reason);
                return output;
            }
        };

        output.insert_number(keys::PAGE_COUNT, doc.get_pages().len() as f64);

        if doc.trailer.get(b"Encrypt").is_ok() {
            output.partial(
                FieldGroup::Descriptive,
                "documento cifrado: el diccionario Info no se evalúa",
            );
            return output;
        }

        if has_xmp_packet(&doc) {
            output.insert_text(keys::PDF_XMP_PACKET, "presente");
        }

        let Some(info) = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| deref_dictionary(&doc, info))
        else {
            return output;
        };
        collect_info(&doc, info, &mut output);
        output
    }
}

fn collect_info(doc: &Document, info: &Dictionary, output: &mut ExtractedFields) {
    for (name, key) in INFO_TEXT_FIELDS {
        if let Some(value) = info.get(name).ok().and_then(|obj| object_to_string(doc, obj)) {
            output.insert_text(key, &value);
        }
    }

    for (name, key) in INFO_DATE_FIELDS {
        if let Some(raw) = info.get(name).ok().and_then(|obj| object_to_string(doc, obj)) {
            output.insert_date(key, &raw, parse_pdf_date(&raw));
        }
    }

    // Entradas no estándar del diccionario Info.
    for (name, value) in info.iter() {
        let known = INFO_TEXT_FIELDS.iter().any(|(field, _)| *field == name.as_slice())
            || INFO_DATE_FIELDS.iter().any(|(field, _)| *field == name.as_slice())
            || name.as_slice() == b"Trapped";
        if known {
            continue;
        }
        if let Some(text) = object_to_string(doc, value) {
            let key = format!("pdf.info.{}", String::from_utf8_lossy(name));
            output.insert_text(key, &text);
        }
    }
}

fn has_xmp_packet(doc: &Document) -> bool {
    doc.trailer
        .get(b"Root")
        .ok()
        .and_then(|root| deref_dictionary(doc, root))
        .is_some_and(|catalog| catalog.get(b"Metadata").is_ok())
}

fn deref_dictionary<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(reference) => doc.get_dictionary(*reference).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn object_to_string(doc: &Document, obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).trim().to_string()),
        Object::Reference(reference) => doc
            .get_object(*reference)
            .ok()
            .and_then(|inner| object_to_string(doc, inner)),
        _ => None,
    }
}

/// Cadenas de texto PDF: UTF-16BE con BOM o PDFDocEncoding (aproximado como Latin-1).
fn decode_pdf_text(bytes: &[u8]) -> String {
    let text = match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, false),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).to_string(),
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        },
    };
    text.trim().to_string()
}
