//! Extracción de metadata para audio y video.
//!
//! Contenedores con decodificador: MP3 (ID3v2.3/2.4), MP4/MOV/M4A, WAV y
//! FLAC. El resto se reporta como contenedor sin decodificador.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tracing::debug;

use super::dates::{mp4_timestamp, parse_iso_date};
use super::{ExtractedFields, FieldExtractor, SeekRead, decode_utf16, read_ascii_field};
use crate::geo;
use crate::probe::FormatProbe;
use crate::record::{BytesRef, FieldGroup, FieldValue, FormatKind, keys};

const MPEG_SCAN_LEN: u64 = 64 * 1024;
const MOOV_LIMIT: usize = 16 * 1024 * 1024;

pub struct MediaExtractor;

impl FieldExtractor for MediaExtractor {
    fn family(&self) -> FormatKind {
        FormatKind::MediaFile
    }

    fn extract_fields(&self, reader: &mut dyn SeekRead, probe: &FormatProbe) -> ExtractedFields {
        let mut output = ExtractedFields::default();
        let result = match probe.subtype() {
            "mp3" => read_mp3_metadata(reader, &mut output),
            "mp4" | "m4a" | "m4v" | "mov" | "3gp" => read_mp4_metadata(reader, &mut output),
            "wav" => read_wav_metadata(reader, &mut output),
            "flac" => read_flac_metadata(reader, &mut output),
            other => {
                output.partial(
                    FieldGroup::Container,
                    format!("contenedor `{other}` sin decodificador"),
                );
                return output;
            }
        };
        if let Err(error) = result {
            debug!(%error, subtype = probe.subtype(), "contenedor multimedia ilegible");
            output.partial(
                FieldGroup::Container,
                format!("contenedor ilegible: {error}"),
            );
        }
        output
    }
}

/// Aplica una fecha de etiqueta: si es completa se guarda como marca de
/// tiempo, si no (p. ej. solo el año) queda como texto.
fn insert_tag_date(output: &mut ExtractedFields, key: &str, raw: &str) {
    match parse_iso_date(raw) {
        Some(value) if !output.fields.contains_key(key) => {
            output.insert(key, FieldValue::Timestamp(value));
        }
        Some(_) => {}
        None => output.insert_text("media.tag.date", raw),
    }
}

// === MP3 ===

fn read_mp3_metadata(reader: &mut dyn SeekRead, output: &mut ExtractedFields) -> io::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0_u8; 10];
    reader.read_exact(&mut header)?;

    let audio_offset = if &header[0..3] == b"ID3" {
        let size = u64::from(synchsafe_to_u32(&header[6..10]));
        let mut tag = Vec::new();
        (&mut *reader).take(size).read_to_end(&mut tag)?;
        if (tag.len() as u64) < size {
            output.partial(FieldGroup::MediaTags, "etiqueta ID3v2 truncada");
        } else {
            parse_id3v2(header[3], header[4], &tag, output);
        }
        10 + size
    } else {
        0
    };

    read_mpeg_stream(reader, audio_offset, output)
}

fn parse_id3v2(major: u8, revision: u8, tag: &[u8], output: &mut ExtractedFields) {
    if major != 3 && major != 4 {
        output.partial(
            FieldGroup::MediaTags,
            format!("versión ID3v2.{major} sin soporte"),
        );
        return;
    }
    output.insert_text("media.tag.id3Version", &format!("v2.{major}.{revision}"));

    let mut offset = 0;
    while offset + 10 <= tag.len() {
        let frame_id = &tag[offset..offset + 4];
        if frame_id.iter().all(|b| *b == 0) {
            break;
        }
        if !frame_id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            output.partial(FieldGroup::MediaTags, "marco ID3 con identificador inválido");
            break;
        }
        let size_bytes = &tag[offset + 4..offset + 8];
        let frame_size = if major == 4 {
            synchsafe_to_u32(size_bytes)
        } else {
            u32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
        } as usize;
        let frame_start = offset + 10;
        let frame_end = frame_start + frame_size;
        if frame_end > tag.len() {
            output.partial(FieldGroup::MediaTags, "marco ID3 excede la etiqueta");
            break;
        }
        let frame = &tag[frame_start..frame_end];
        apply_id3_frame(frame_id, frame, (10 + frame_start) as u64, output);
        offset = frame_end;
    }
}

fn apply_id3_frame(frame_id: &[u8], frame: &[u8], file_offset: u64, output: &mut ExtractedFields) {
    let text_key = match frame_id {
        b"TIT2" => Some(keys::TITLE),
        b"TPE1" => Some("media.tag.artist"),
        b"TALB" => Some("media.tag.album"),
        b"TCON" => Some("media.tag.genre"),
        b"TCOM" => Some("media.tag.composer"),
        b"TPUB" => Some("media.tag.publisher"),
        b"TENC" => Some("media.tag.encodedBy"),
        b"TSSE" => Some(keys::SOFTWARE),
        b"TCOP" => Some("copyright"),
        _ => None,
    };
    if let Some(key) = text_key {
        if let Some(value) = decode_id3_text(frame) {
            output.insert_text(key, &value);
        }
        return;
    }

    match frame_id {
        b"TDRC" | b"TYER" => {
            if let Some(value) = decode_id3_text(frame) {
                insert_tag_date(output, keys::EMBEDDED_CREATED_AT, &value);
            }
        }
        b"COMM" => {
            if let Some(text) = parse_comment(frame) {
                output.insert_text(keys::COMMENTS, &text);
            }
        }
        b"TXXX" => {
            if let Some((description, value)) = parse_user_text(frame) {
                output.insert_text(format!("media.tag.{description}"), &value);
            }
        }
        b"APIC" => output.insert(
            "media.coverArt",
            FieldValue::BytesRef(BytesRef {
                offset: file_offset,
                length: frame.len() as u64,
            }),
        ),
        _ => {}
    }
}

fn synchsafe_to_u32(bytes: &[u8]) -> u32 {
    let mut value = 0_u32;
    for &b in bytes {
        value = (value << 7) | (b as u32 & 0x7F);
    }
    value
}

fn decode_id3_text(frame: &[u8]) -> Option<String> {
    let (&encoding, data) = frame.split_first()?;
    let text = decode_id3_string(encoding, data);
    // ID3v2.4 separa valores múltiples con NUL.
    let text = text.split('\0').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("; ");
    Some(text.trim().to_string())
}

fn decode_id3_string(encoding: u8, data: &[u8]) -> String {
    match encoding {
        0 => data.iter().map(|&b| char::from(b)).collect::<String>(),
        1 => match data {
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, true),
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, false),
            _ => decode_utf16(data, false),
        },
        2 => decode_utf16(data, false),
        _ => String::from_utf8_lossy(data).to_string(),
    }
}

/// Separa el primer campo terminado en NUL (doble NUL en UTF-16).
fn split_terminated(encoding: u8, data: &[u8]) -> (&[u8], &[u8]) {
    if matches!(encoding, 1 | 2) {
        let mut index = 0;
        while index + 1 < data.len() {
            if data[index] == 0 && data[index + 1] == 0 {
                return (&data[..index], &data[index + 2..]);
            }
            index += 2;
        }
        (data, &[])
    } else {
        match data.iter().position(|b| *b == 0) {
            Some(index) => (&data[..index], &data[index + 1..]),
            None => (data, &[]),
        }
    }
}

/// `COMM`: codificación, idioma (3 bytes), descripción corta y texto.
fn parse_comment(frame: &[u8]) -> Option<String> {
    if frame.len() < 4 {
        return None;
    }
    let encoding = frame[0];
    let (_, text) = split_terminated(encoding, &frame[4..]);
    let text = decode_id3_string(encoding, text);
    let text = text.trim_matches('\0').trim();
    Some(text.to_string())
}

fn parse_user_text(frame: &[u8]) -> Option<(String, String)> {
    let (&encoding, data) = frame.split_first()?;
    let (description, value) = split_terminated(encoding, data);
    let description = decode_id3_string(encoding, description);
    let description = description.trim();
    if description.is_empty() {
        return None;
    }
    let value = decode_id3_string(encoding, value);
    Some((description.to_string(), value.trim_matches('\0').trim().to_string()))
}

fn read_mpeg_stream(
    reader: &mut dyn SeekRead,
    audio_offset: u64,
    output: &mut ExtractedFields,
) -> io::Result<()> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(audio_offset))?;
    let mut buffer = Vec::new();
    (&mut *reader).take(MPEG_SCAN_LEN).read_to_end(&mut buffer)?;

    let Some(frame) = buffer
        .windows(4)
        .find_map(|window| parse_mpeg_frame_header([window[0], window[1], window[2], window[3]]))
    else {
        output.partial(FieldGroup::Container, "no se encontró un marco MPEG válido");
        return Ok(());
    };

    output.insert_text("media.codec", &format!("{} {}", frame.mpeg_version, frame.layer));
    if let Some(rate) = frame.sample_rate {
        output.insert_number("media.sampleRateHz", f64::from(rate));
    }
    if let Some(bitrate) = frame.bitrate_kbps {
        output.insert_number("media.bitrateKbps", f64::from(bitrate));
        let audio_size = file_size.saturating_sub(audio_offset);
        let duration = (audio_size as f64 * 8.0) / (f64::from(bitrate) * 1000.0);
        output.insert_number(keys::DURATION_SECONDS, duration);
    }
    if let Some(encoder) = detect_mp3_encoder(&buffer) {
        output.insert_text("media.encoder", &encoder);
    }
    Ok(())
}

struct MpegFrameHeader {
    mpeg_version: &'static str,
    layer: &'static str,
    bitrate_kbps: Option<u32>,
    sample_rate: Option<u32>,
}

fn parse_mpeg_frame_header(bytes: [u8; 4]) -> Option<MpegFrameHeader> {
    if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
        return None;
    }
    let header = u32::from_be_bytes(bytes);
    let version_bits = (header >> 19) & 0x3;
    let layer_bits = (header >> 17) & 0x3;
    let bitrate_index = (header >> 12) & 0xF;
    let sample_index = (header >> 10) & 0x3;
    // Combinaciones reservadas: no es una cabecera real.
    if version_bits == 0b01 || layer_bits == 0 || bitrate_index == 0xF || sample_index == 0b11 {
        return None;
    }

    let (mpeg_version, sample_rate) = match version_bits {
        0b11 => ("MPEG1", mp3_sample_rate(sample_index, 44100, 48000, 32000)),
        0b10 => ("MPEG2", mp3_sample_rate(sample_index, 22050, 24000, 16000)),
        _ => ("MPEG2.5", mp3_sample_rate(sample_index, 11025, 12000, 8000)),
    };
    let layer = match layer_bits {
        0b01 => "Layer III",
        0b10 => "Layer II",
        _ => "Layer I",
    };
    Some(MpegFrameHeader {
        mpeg_version,
        layer,
        bitrate_kbps: mp3_bitrate(layer_bits, version_bits, bitrate_index),
        sample_rate,
    })
}

fn mp3_sample_rate(index: u32, a: u32, b: u32, c: u32) -> Option<u32> {
    match index {
        0 => Some(a),
        1 => Some(b),
        2 => Some(c),
        _ => None,
    }
}

fn mp3_bitrate(layer_bits: u32, version_bits: u32, index: u32) -> Option<u32> {
    if index == 0 || index == 0xF {
        return None;
    }
    let table = match (version_bits, layer_bits) {
        (0b11, 0b01) => [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
        (0b11, 0b10) => [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        (0b11, 0b11) => [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
        _ => [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    };
    Some(table[index as usize])
}

fn detect_mp3_encoder(data: &[u8]) -> Option<String> {
    ["LAME", "Lavf", "iTunes", "FhG"].into_iter().find_map(|marker| {
        let index = find_bytes(data, marker.as_bytes())?;
        Some(read_tag_label(data, index, 12).unwrap_or_else(|| marker.to_string()))
    })
}

fn read_tag_label(data: &[u8], start: usize, max: usize) -> Option<String> {
    let end = (start + max).min(data.len());
    let label: String = data[start..end]
        .iter()
        .take_while(|b| b.is_ascii_graphic() || **b == b' ')
        .map(|&b| char::from(b))
        .collect();
    let label = label.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// === MP4/MOV ===

struct BoxHeader {
    kind: [u8; 4],
    /// `None` cuando la caja se extiende hasta el final del archivo.
    payload_size: Option<u64>,
}

fn read_box_header<R: Read + ?Sized>(reader: &mut R) -> Option<BoxHeader> {
    let mut buffer = [0_u8; 8];
    reader.read_exact(&mut buffer).ok()?;
    let size = u64::from(u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]));
    let mut kind = [0_u8; 4];
    kind.copy_from_slice(&buffer[4..8]);
    let payload_size = match size {
        0 => None,
        1 => {
            let mut large = [0_u8; 8];
            reader.read_exact(&mut large).ok()?;
            Some(u64::from_be_bytes(large).checked_sub(16)?)
        }
        size => Some(size.checked_sub(8)?),
    };
    Some(BoxHeader { kind, payload_size })
}

/// Lee como máximo `limit` bytes del contenido y salta el resto.
fn read_box_payload<R: Read + Seek + ?Sized>(
    reader: &mut R,
    payload_size: u64,
    limit: usize,
) -> io::Result<Vec<u8>> {
    let kept = payload_size.min(limit as u64);
    let mut buffer = Vec::new();
    (&mut *reader).take(kept).read_to_end(&mut buffer)?;
    if (buffer.len() as u64) < kept {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "caja MP4 truncada"));
    }
    let skipped = payload_size - kept;
    if skipped > 0 {
        skip_forward(reader, skipped)?;
    }
    Ok(buffer)
}

/// Avanza `amount` bytes. Un tamaño que apunta fuera del flujo es un error de
/// estructura: nunca se retrocede ni se salta más allá del final.
fn skip_forward<R: Seek + ?Sized>(reader: &mut R, amount: u64) -> io::Result<u64> {
    let current = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    let target = current
        .checked_add(amount)
        .filter(|target| *target <= end)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("caja MP4 de {amount} bytes fuera del archivo"),
            )
        })?;
    reader.seek(SeekFrom::Start(target))
}

fn box_name(kind: &[u8; 4]) -> String {
    kind.iter().map(|&b| char::from(b)).collect()
}

fn read_mp4_metadata(reader: &mut dyn SeekRead, output: &mut ExtractedFields) -> io::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut moov_found = false;
    while let Some(header) = read_box_header(reader) {
        let Some(payload_size) = header.payload_size else {
            break;
        };
        match &header.kind {
            b"ftyp" => {
                let payload = read_box_payload(reader, payload_size, 1024)?;
                let brands: Vec<String> = payload
                    .chunks_exact(4)
                    .enumerate()
                    .filter(|(index, _)| *index != 1)
                    .filter_map(|(_, brand)| read_ascii_field(brand))
                    .collect();
                if !brands.is_empty() {
                    output.insert_text("media.brands", &brands.join(", "));
                }
            }
            b"moov" => {
                moov_found = true;
                let payload = read_box_payload(reader, payload_size, MOOV_LIMIT)?;
                parse_mp4_moov(&payload, output);
            }
            _ => {
                skip_forward(reader, payload_size)?;
            }
        }
    }
    if !moov_found {
        output.partial(FieldGroup::Container, "estructura MP4 sin átomo moov");
    }
    Ok(())
}

fn parse_mp4_moov(data: &[u8], output: &mut ExtractedFields) {
    let mut cursor = Cursor::new(data);
    while let Some(header) = read_box_header(&mut cursor) {
        let size = header.payload_size.unwrap_or(data.len() as u64 - cursor.position());
        let Ok(payload) = read_box_payload(&mut cursor, size, MOOV_LIMIT) else {
            break;
        };
        match &header.kind {
            b"mvhd" => parse_mvhd(&payload, output),
            b"udta" => parse_udta(&payload, output),
            b"meta" => parse_meta(&payload, output),
            _ => {}
        }
    }
}

fn parse_mvhd(payload: &[u8], output: &mut ExtractedFields) {
    let be32 = |at: usize| u32::from_be_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]]);
    let be64 = |at: usize| (u64::from(be32(at)) << 32) | u64::from(be32(at + 4));
    let (creation, modification, timescale, duration) = match payload.first() {
        Some(1) if payload.len() >= 32 => (be64(4), be64(12), be32(20), be64(24)),
        Some(0) if payload.len() >= 20 => (
            u64::from(be32(4)),
            u64::from(be32(8)),
            be32(12),
            u64::from(be32(16)),
        ),
        _ => {
            output.partial(FieldGroup::EmbeddedDates, "átomo mvhd truncado");
            return;
        }
    };
    // Un cero indica fecha sin asignar.
    if let Some(value) = mp4_timestamp(creation) {
        output.insert(keys::EMBEDDED_CREATED_AT, FieldValue::Timestamp(value));
    }
    if let Some(value) = mp4_timestamp(modification) {
        output.insert(keys::EMBEDDED_MODIFIED_AT, FieldValue::Timestamp(value));
    }
    if timescale > 0 {
        output.insert_number(keys::DURATION_SECONDS, duration as f64 / f64::from(timescale));
    }
}

/// Átomos `udta` de QuickTime: entradas `©xyz`, `©mak`, … y un `meta` opcional.
fn parse_udta(data: &[u8], output: &mut ExtractedFields) {
    let mut cursor = Cursor::new(data);
    while let Some(header) = read_box_header(&mut cursor) {
        let size = header.payload_size.unwrap_or(data.len() as u64 - cursor.position());
        let Ok(payload) = read_box_payload(&mut cursor, size, MOOV_LIMIT) else {
            break;
        };
        if &header.kind == b"meta" {
            parse_meta(&payload, output);
        } else if header.kind[0] == 0xA9 {
            if let Some(text) = quicktime_string(&payload) {
                apply_quicktime_tag(&box_name(&header.kind), &text, output);
            }
        }
    }
}

/// Cadena de usuario QuickTime: longitud (u16), idioma (u16) y texto.
fn quicktime_string(payload: &[u8]) -> Option<String> {
    if payload.len() >= 4 {
        let length = usize::from(u16::from_be_bytes([payload[0], payload[1]]));
        if length > 0 && 4 + length <= payload.len() {
            return read_ascii_field(&payload[4..4 + length]);
        }
    }
    // Estilo iTunes: caja `data` anidada.
    data_box_value(payload)
}

/// `meta` con tabla `keys` (QuickTime) o etiquetas `ilst` con nombre (iTunes).
fn parse_meta(data: &[u8], output: &mut ExtractedFields) {
    // La variante MP4 es una full box con 4 bytes de versión y banderas.
    let body = if data.len() >= 8 && &data[4..8] == b"hdlr" {
        data
    } else {
        data.get(4..).unwrap_or_default()
    };
    let mut key_names: Vec<String> = Vec::new();
    let mut cursor = Cursor::new(body);
    while let Some(header) = read_box_header(&mut cursor) {
        let size = header.payload_size.unwrap_or(body.len() as u64 - cursor.position());
        let Ok(payload) = read_box_payload(&mut cursor, size, MOOV_LIMIT) else {
            break;
        };
        match &header.kind {
            b"keys" => key_names = parse_keys_table(&payload),
            b"ilst" => parse_ilst(&payload, &key_names, output),
            _ => {}
        }
    }
}

fn parse_keys_table(payload: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut offset = 8;
    while offset + 8 <= payload.len() {
        let size = u32::from_be_bytes([
            payload[offset],
            payload[offset + 1],
            payload[offset + 2],
            payload[offset + 3],
        ]) as usize;
        if size < 8 || offset + size > payload.len() {
            break;
        }
        names.push(String::from_utf8_lossy(&payload[offset + 8..offset + size]).to_string());
        offset += size;
    }
    names
}

fn parse_ilst(data: &[u8], key_names: &[String], output: &mut ExtractedFields) {
    let mut cursor = Cursor::new(data);
    while let Some(header) = read_box_header(&mut cursor) {
        let size = header.payload_size.unwrap_or(data.len() as u64 - cursor.position());
        let Ok(payload) = read_box_payload(&mut cursor, size, MOOV_LIMIT) else {
            break;
        };
        let Some(value) = data_box_value(&payload) else {
            continue;
        };
        let name = if header.kind[0] == 0xA9 {
            box_name(&header.kind)
        } else {
            // Índice 1-based dentro de la tabla `keys`.
            let index = u32::from_be_bytes(header.kind) as usize;
            match index.checked_sub(1).and_then(|i| key_names.get(i)) {
                Some(name) => name.clone(),
                None => continue,
            }
        };
        apply_quicktime_tag(&name, &value, output);
    }
}

/// Texto de una caja `data`: tipo (4 bytes), locale (4 bytes) y valor.
fn data_box_value(payload: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(payload);
    while let Some(header) = read_box_header(&mut cursor) {
        let size = header.payload_size.unwrap_or(payload.len() as u64 - cursor.position());
        let inner = read_box_payload(&mut cursor, size, MOOV_LIMIT).ok()?;
        if &header.kind == b"data" && inner.len() > 8 {
            return read_ascii_field(&inner[8..]);
        }
    }
    None
}

fn apply_quicktime_tag(name: &str, value: &str, output: &mut ExtractedFields) {
    let key = match name {
        "©xyz" | "com.apple.quicktime.location.ISO6709" => {
            match geo::parse_iso6709(value) {
                Ok(point) => output.geo = Some(point),
                Err(error) => output.partial(FieldGroup::Location, error.to_string()),
            }
            return;
        }
        "©day" | "com.apple.quicktime.creationdate" => {
            insert_tag_date(output, keys::CAPTURED_AT, value);
            return;
        }
        "©mak" | "com.apple.quicktime.make" => keys::DEVICE_MAKE.to_string(),
        "©mod" | "com.apple.quicktime.model" => keys::DEVICE_MODEL.to_string(),
        "©too" | "©swr" | "com.apple.quicktime.software" => keys::SOFTWARE.to_string(),
        "©aut" | "com.apple.quicktime.author" => keys::AUTHOR.to_string(),
        "©cmt" | "com.apple.quicktime.comment" => keys::COMMENTS.to_string(),
        "©nam" | "com.apple.quicktime.title" => keys::TITLE.to_string(),
        "©ART" => "media.tag.artist".to_string(),
        "©alb" => "media.tag.album".to_string(),
        other => {
            let short = other
                .trim_start_matches('©')
                .trim_start_matches("com.apple.quicktime.");
            format!("media.tag.{short}")
        }
    };
    output.insert_text(key, value);
}

// === WAV ===

fn read_wav_metadata(reader: &mut dyn SeekRead, output: &mut ExtractedFields) -> io::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0_u8; 12];
    reader.read_exact(&mut header)?;
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        output.partial(FieldGroup::Container, "cabecera RIFF/WAVE inválida");
        return Ok(());
    }

    let mut byte_rate = None;
    loop {
        let mut chunk_header = [0_u8; 8];
        if reader.read_exact(&mut chunk_header).is_err() {
            break;
        }
        let size = u32::from_le_bytes([
            chunk_header[4],
            chunk_header[5],
            chunk_header[6],
            chunk_header[7],
        ]) as u64;
        match &chunk_header[0..4] {
            b"fmt " => {
                let payload = read_chunk(reader, size, 64)?;
                if payload.len() >= 16 {
                    let channels = u16::from_le_bytes([payload[2], payload[3]]);
                    let sample_rate =
                        u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
                    let rate = u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]);
                    byte_rate = Some(rate);
                    output.insert_number("media.channels", f64::from(channels));
                    output.insert_number("media.sampleRateHz", f64::from(sample_rate));
                }
            }
            b"data" => {
                if let Some(rate) = byte_rate.filter(|rate| *rate > 0) {
                    output.insert_number(keys::DURATION_SECONDS, size as f64 / f64::from(rate));
                }
                reader.seek(SeekFrom::Current(size as i64))?;
            }
            b"LIST" => {
                let payload = read_chunk(reader, size, 64 * 1024)?;
                if payload.starts_with(b"INFO") {
                    parse_riff_info(&payload[4..], output);
                }
            }
            b"bext" => {
                let payload = read_chunk(reader, size, 602)?;
                parse_bext(&payload, output);
            }
            _ => {
                reader.seek(SeekFrom::Current(size as i64))?;
            }
        }
        if size % 2 == 1 {
            reader.seek(SeekFrom::Current(1))?;
        }
    }
    Ok(())
}

/// Lee hasta `limit` bytes de un chunk RIFF y salta el resto.
fn read_chunk(reader: &mut dyn SeekRead, size: u64, limit: u64) -> io::Result<Vec<u8>> {
    let kept = size.min(limit);
    let mut payload = Vec::new();
    (&mut *reader).take(kept).read_to_end(&mut payload)?;
    if size > kept {
        reader.seek(SeekFrom::Current((size - kept) as i64))?;
    }
    Ok(payload)
}

fn parse_riff_info(data: &[u8], output: &mut ExtractedFields) {
    let mut offset = 0;
    while offset + 8 <= data.len() {
        let id = &data[offset..offset + 4];
        let size = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let start = offset + 8;
        let end = (start + size).min(data.len());
        let Some(value) = read_ascii_field(&data[start..end]) else {
            offset = start + size + size % 2;
            continue;
        };
        match id {
            b"INAM" => output.insert_text(keys::TITLE, &value),
            b"IART" => output.insert_text("media.tag.artist", &value),
            b"ICMT" => output.insert_text(keys::COMMENTS, &value),
            b"ISFT" => output.insert_text(keys::SOFTWARE, &value),
            b"ICOP" => output.insert_text("copyright", &value),
            b"ISBJ" => output.insert_text(keys::SUBJECT, &value),
            b"IKEY" => output.insert_text(keys::KEYWORDS, &value),
            b"ICRD" => insert_tag_date(output, keys::EMBEDDED_CREATED_AT, &value),
            other => {
                let name = String::from_utf8_lossy(other).to_lowercase();
                output.insert_text(format!("media.tag.{name}"), &value);
            }
        }
        offset = start + size + size % 2;
    }
}

/// Broadcast Wave: descripción (256), originador (32), referencia (32),
/// fecha (10) y hora (8).
fn parse_bext(payload: &[u8], output: &mut ExtractedFields) {
    let field = |start: usize, len: usize| {
        payload
            .get(start..(start + len).min(payload.len()))
            .and_then(read_ascii_field)
    };
    if let Some(description) = field(0, 256) {
        output.insert_text("media.tag.description", &description);
    }
    if let Some(originator) = field(256, 32) {
        output.insert_text("media.tag.originator", &originator);
    }
    if let Some(reference) = field(288, 32) {
        output.insert_text("media.tag.originatorReference", &reference);
    }
    if let Some(date) = field(320, 10) {
        let time = field(330, 8).unwrap_or_else(|| "00:00:00".to_string());
        let raw = format!("{}T{}", date.replace([':', '/', '.'], "-"), time.replace(['-', '.'], ":"));
        match parse_iso_date(&raw) {
            Some(value) => output.insert(keys::EMBEDDED_CREATED_AT, FieldValue::Timestamp(value)),
            None => output.insert_date(keys::EMBEDDED_CREATED_AT, &raw, None),
        }
    }
}

// === FLAC ===

fn read_flac_metadata(reader: &mut dyn SeekRead, output: &mut ExtractedFields) -> io::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut signature = [0_u8; 4];
    reader.read_exact(&mut signature)?;
    if &signature != b"fLaC" {
        // FLAC precedido de ID3: no se decodifica la etiqueta previa.
        output.partial(FieldGroup::Container, "flujo FLAC sin firma inicial");
        return Ok(());
    }

    let mut is_last = false;
    while !is_last {
        let mut header = [0_u8; 4];
        reader.read_exact(&mut header)?;
        is_last = header[0] & 0x80 != 0;
        let block_type = header[0] & 0x7F;
        let length = (u64::from(header[1]) << 16) | (u64::from(header[2]) << 8) | u64::from(header[3]);
        let block_offset = reader.stream_position()?;
        match block_type {
            0 => {
                let payload = read_chunk(reader, length, length)?;
                parse_streaminfo(&payload, output);
            }
            4 => {
                let payload = read_chunk(reader, length, length)?;
                parse_vorbis_comments(&payload, output);
            }
            6 => {
                output.insert(
                    "media.coverArt",
                    FieldValue::BytesRef(BytesRef {
                        offset: block_offset,
                        length,
                    }),
                );
                reader.seek(SeekFrom::Current(length as i64))?;
            }
            _ => {
                reader.seek(SeekFrom::Current(length as i64))?;
            }
        }
    }
    Ok(())
}

fn parse_streaminfo(payload: &[u8], output: &mut ExtractedFields) {
    if payload.len() < 18 {
        return;
    }
    let sample_rate = ((payload[10] as u32) << 12)
        | ((payload[11] as u32) << 4)
        | ((payload[12] as u32) >> 4);
    let channels = ((payload[12] >> 1) & 0x07) + 1;
    let total_samples = ((payload[13] as u64 & 0x0F) << 32)
        | ((payload[14] as u64) << 24)
        | ((payload[15] as u64) << 16)
        | ((payload[16] as u64) << 8)
        | payload[17] as u64;
    output.insert_number("media.sampleRateHz", f64::from(sample_rate));
    output.insert_number("media.channels", f64::from(channels));
    if sample_rate > 0 && total_samples > 0 {
        output.insert_number(
            keys::DURATION_SECONDS,
            total_samples as f64 / f64::from(sample_rate),
        );
    }
}

fn read_u32_le(cursor: &mut &[u8]) -> Option<u32> {
    let (bytes, rest) = cursor.split_first_chunk::<4>()?;
    *cursor = rest;
    Some(u32::from_le_bytes(*bytes))
}

fn parse_vorbis_comments(payload: &[u8], output: &mut ExtractedFields) {
    let mut cursor = payload;
    let Some(vendor_len) = read_u32_le(&mut cursor).map(|len| len as usize) else {
        return;
    };
    if cursor.len() < vendor_len {
        output.partial(FieldGroup::MediaTags, "comentario Vorbis truncado");
        return;
    }
    if let Some(vendor) = read_ascii_field(&cursor[..vendor_len]) {
        output.insert_text("media.encoder", &vendor);
    }
    cursor = &cursor[vendor_len..];
    let count = read_u32_le(&mut cursor).unwrap_or(0);
    for _ in 0..count {
        let Some(len) = read_u32_le(&mut cursor).map(|len| len as usize) else {
            break;
        };
        if cursor.len() < len {
            output.partial(FieldGroup::MediaTags, "comentario Vorbis truncado");
            break;
        }
        let entry = String::from_utf8_lossy(&cursor[..len]).to_string();
        cursor = &cursor[len..];
        if let Some((name, value)) = entry.split_once('=') {
            apply_vorbis_comment(name, value, output);
        }
    }
}

fn apply_vorbis_comment(name: &str, value: &str, output: &mut ExtractedFields) {
    match name.to_ascii_uppercase().as_str() {
        "TITLE" => output.insert_text(keys::TITLE, value),
        "ARTIST" => output.insert_text("media.tag.artist", value),
        "ALBUM" => output.insert_text("media.tag.album", value),
        "COMMENT" | "DESCRIPTION" => output.insert_text(keys::COMMENTS, value),
        "ORGANIZATION" => output.insert_text(keys::ORGANIZATION, value),
        "COPYRIGHT" => output.insert_text("copyright", value),
        "ENCODER" | "ENCODED-BY" => output.insert_text(keys::SOFTWARE, value),
        "DATE" => insert_tag_date(output, keys::EMBEDDED_CREATED_AT, value),
        other => output.insert_text(format!("media.tag.{}", other.to_lowercase()), value),
    }
}
