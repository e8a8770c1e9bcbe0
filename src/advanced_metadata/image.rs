//! Extracción de metadata EXIF relevante para imágenes.

use std::io::BufReader;

use exif::{Context, Exif, Field, In, Tag, Value};
use tracing::debug;

use super::dates::parse_exif_datetime;
use super::{ExtractedFields, FieldExtractor, SeekRead, decode_utf16, read_ascii_field};
use crate::geo::{self, DmsTriplet, RawAltitude, RawPosition};
use crate::probe::FormatProbe;
use crate::record::{BytesRef, FieldGroup, FieldValue, FormatKind, keys};

const OFFSET_TIME: Tag = Tag(Context::Exif, 0x9010);
const OFFSET_TIME_ORIGINAL: Tag = Tag(Context::Exif, 0x9011);
const OFFSET_TIME_DIGITIZED: Tag = Tag(Context::Exif, 0x9012);
const BODY_SERIAL_NUMBER: Tag = Tag(Context::Exif, 0xa431);
const LENS_MODEL: Tag = Tag(Context::Exif, 0xa434);

/// Contenedores de imagen donde se busca un bloque EXIF.
const EXIF_CONTAINERS: [&str; 6] = ["jpeg", "tiff", "png", "webp", "heif", "cr2"];

const TEXT_FIELDS: [(Tag, &str); 7] = [
    (Tag::Make, keys::DEVICE_MAKE),
    (Tag::Model, keys::DEVICE_MODEL),
    (BODY_SERIAL_NUMBER, keys::DEVICE_SERIAL),
    (Tag::Software, keys::SOFTWARE),
    (Tag::Artist, keys::AUTHOR),
    (Tag::ImageDescription, keys::TITLE),
    (Tag::Copyright, "copyright"),
];

const CAMERA_SETTINGS: [(Tag, &str); 6] = [
    (Tag::ExposureTime, "exif.exposureTime"),
    (Tag::FNumber, "exif.fNumber"),
    (Tag::PhotographicSensitivity, "exif.iso"),
    (Tag::FocalLength, "exif.focalLength"),
    (Tag::Flash, "exif.flash"),
    (LENS_MODEL, "exif.lensModel"),
];

/// (fecha, fracción de segundo, zona, clave destino)
const DATE_FIELDS: [(Tag, Tag, Tag, &str); 3] = [
    (
        Tag::DateTimeOriginal,
        Tag::SubSecTimeOriginal,
        OFFSET_TIME_ORIGINAL,
        keys::CAPTURED_AT,
    ),
    (
        Tag::DateTimeDigitized,
        Tag::SubSecTimeDigitized,
        OFFSET_TIME_DIGITIZED,
        keys::DIGITIZED_AT,
    ),
    (
        Tag::DateTime,
        Tag::SubSecTime,
        OFFSET_TIME,
        keys::EMBEDDED_MODIFIED_AT,
    ),
];

pub struct ImageExtractor;

impl FieldExtractor for ImageExtractor {
    fn family(&self) -> FormatKind {
        FormatKind::Image
    }

    fn extract_fields(&self, reader: &mut dyn SeekRead, probe: &FormatProbe) -> ExtractedFields {
        let mut output = ExtractedFields::default();
        if !EXIF_CONTAINERS.contains(&probe.subtype()) {
            return output;
        }

        let mut bufreader = BufReader::new(reader);
        let mut exif_reader = exif::Reader::new();
        exif_reader.continue_on_error(true);
        let exif = match exif_reader.read_from_container(&mut bufreader) {
            Ok(exif) => exif,
            Err(exif::Error::PartialResult(partial)) => {
                let (exif, errors) = partial.into_inner();
                let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
                debug!(errors = reasons.len(), "bloque EXIF leído parcialmente");
                output.partial(FieldGroup::Exif, reasons.join("; "));
                exif
            }
            // Sin bloque EXIF: el grupo está ausente, no dañado.
            Err(exif::Error::NotFound(_)) => return output,
            Err(error) => {
                output.partial(FieldGroup::Exif, format!("bloque EXIF ilegible: {error}"));
                return output;
            }
        };

        collect_exif_fields(&exif, &mut output);
        output
    }
}

fn collect_exif_fields(exif: &Exif, output: &mut ExtractedFields) {
    for (tag, key) in TEXT_FIELDS {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            output.insert_text(key, &ascii_value(field));
        }
    }

    if let Some(field) = exif.get_field(Tag::UserComment, In::PRIMARY) {
        output.insert_text(keys::COMMENTS, &user_comment(field, exif.little_endian()));
    }

    for (tag, subsec_tag, offset_tag, key) in DATE_FIELDS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };
        let raw = ascii_value(field);
        let subsec = exif.get_field(subsec_tag, In::PRIMARY).map(ascii_value);
        let offset = exif.get_field(offset_tag, In::PRIMARY).map(ascii_value);
        let parsed = parse_exif_datetime(&raw, subsec.as_deref(), offset.as_deref());
        output.insert_date(key, &raw, parsed);
    }

    for (tag, key) in CAMERA_SETTINGS {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            let value = match &field.value {
                Value::Ascii(_) => ascii_value(field),
                _ => field.display_value().with_unit(exif).to_string(),
            };
            output.insert_text(key, &value);
        }
    }

    if let Some(orientation) = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    {
        output.insert_number("exif.orientation", f64::from(orientation));
    }

    let width = first_uint(exif, &[Tag::PixelXDimension, Tag::ImageWidth]);
    let height = first_uint(exif, &[Tag::PixelYDimension, Tag::ImageLength]);
    if let Some(width) = width {
        output.insert_number(keys::IMAGE_WIDTH, f64::from(width));
    }
    if let Some(height) = height {
        output.insert_number(keys::IMAGE_HEIGHT, f64::from(height));
    }

    let thumbnail_offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)
        .and_then(|field| field.value.get_uint(0));
    let thumbnail_length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)
        .and_then(|field| field.value.get_uint(0));
    if let (Some(offset), Some(length)) = (thumbnail_offset, thumbnail_length)
        && length > 0
    {
        output.insert(
            "exif.thumbnail",
            FieldValue::BytesRef(BytesRef {
                offset: u64::from(offset),
                length: u64::from(length),
            }),
        );
    }

    decode_gps(exif, output);
}

fn first_uint(exif: &Exif, tags: &[Tag]) -> Option<u32> {
    tags.iter()
        .find_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .and_then(|field| field.value.get_uint(0))
}

/// Texto de un campo ASCII sin comillas ni relleno; otros tipos usan su forma visible.
fn ascii_value(field: &Field) -> String {
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .filter_map(|part| read_ascii_field(part))
            .collect::<Vec<_>>()
            .join(" "),
        _ => field.display_value().to_string(),
    }
}

/// `UserComment` lleva 8 bytes de juego de caracteres antes del texto.
fn user_comment(field: &Field, little_endian: bool) -> String {
    let Value::Undefined(bytes, _) = &field.value else {
        return ascii_value(field);
    };
    if bytes.len() < 8 {
        return String::new();
    }
    let (charset, text) = bytes.split_at(8);
    if charset.starts_with(b"UNICODE") {
        decode_utf16(text, little_endian)
    } else {
        read_ascii_field(text).unwrap_or_default()
    }
}

fn rational_triplet(field: &Field) -> Option<DmsTriplet> {
    match &field.value {
        Value::Rational(values) if values.len() >= 3 => Some(DmsTriplet::new(
            values[0].to_f64(),
            values[1].to_f64(),
            values[2].to_f64(),
        )),
        _ => None,
    }
}

fn decode_gps(exif: &Exif, output: &mut ExtractedFields) {
    let latitude = exif.get_field(Tag::GPSLatitude, In::PRIMARY);
    let longitude = exif.get_field(Tag::GPSLongitude, In::PRIMARY);
    let (latitude, longitude) = match (latitude, longitude) {
        (None, None) => return,
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => {
            output.partial(FieldGroup::Location, "coordenada GPS incompleta");
            return;
        }
    };
    let (Some(latitude), Some(longitude)) = (rational_triplet(latitude), rational_triplet(longitude))
    else {
        output.partial(FieldGroup::Location, "coordenada GPS con formato inesperado");
        return;
    };

    let reference = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(ascii_value);
    let altitude = exif
        .get_field(Tag::GPSAltitude, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Rational(values) => values.first().map(|value| value.to_f64()),
            _ => None,
        })
        .map(|meters| RawAltitude {
            meters,
            below_sea_level: exif
                .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
                == Some(1),
        });

    let raw = RawPosition::Dms {
        latitude,
        latitude_ref: reference(Tag::GPSLatitudeRef),
        longitude,
        longitude_ref: reference(Tag::GPSLongitudeRef),
        altitude,
    };
    match geo::decode(&raw) {
        Ok(point) => output.geo = Some(point),
        Err(error) => {
            debug!(%error, "coordenada GPS descartada");
            output.partial(FieldGroup::Location, error.to_string());
        }
    }
}
