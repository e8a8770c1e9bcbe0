#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use exif::experimental::Writer as ExifWriter;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use lopdf::{Document, Object, Stream, dictionary};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rationals(tag: Tag, parts: &[(u32, u32)]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            parts
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

fn encode_jpeg() -> TestResult<Vec<u8>> {
    let image = RgbImage::from_pixel(8, 8, Rgb([90, 140, 200]));
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90).encode_image(&image)?;
    Ok(jpeg)
}

/// Inserta un segmento APP1 justo después del marcador SOI.
fn splice_app1(jpeg: &[u8], payload: &[u8]) -> Vec<u8> {
    let length = u16::try_from(payload.len() + 2).unwrap();
    let mut output = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    output.extend_from_slice(&jpeg[..2]);
    output.extend_from_slice(&[0xFF, 0xE1]);
    output.extend_from_slice(&length.to_be_bytes());
    output.extend_from_slice(payload);
    output.extend_from_slice(&jpeg[2..]);
    output
}

/// JPEG con cámara, fecha de captura y posición 40°44'55.77"N 73°59'1.15"W.
pub fn write_jpeg_with_exif(path: &Path) -> TestResult {
    let fields = [
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "Canon EOS 80D"),
        ascii(Tag::Artist, "Ana Perez"),
        ascii(Tag::DateTimeOriginal, "2024:06:15 14:30:00"),
        ascii(Tag::GPSLatitudeRef, "N"),
        rationals(Tag::GPSLatitude, &[(40, 1), (44, 1), (5577, 100)]),
        ascii(Tag::GPSLongitudeRef, "W"),
        rationals(Tag::GPSLongitude, &[(73, 1), (59, 1), (115, 100)]),
    ];

    let mut writer = ExifWriter::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false)?;

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff.get_ref());
    std::fs::write(path, splice_app1(&encode_jpeg()?, &payload))?;
    Ok(())
}

/// JPEG válido cuyo segmento EXIF no contiene un TIFF interpretable.
pub fn write_jpeg_with_corrupt_exif(path: &Path) -> TestResult {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"XX\x00\x2a\xff\xff\xff\xffbasura");
    std::fs::write(path, splice_app1(&encode_jpeg()?, &payload))?;
    Ok(())
}

pub fn write_plain_jpeg(path: &Path) -> TestResult {
    std::fs::write(path, encode_jpeg()?)?;
    Ok(())
}

/// DOCX mínimo con autoría, empresa y una propiedad personalizada.
pub fn write_docx(path: &Path, author: &str, company: &str) -> TestResult {
    write_docx_with_pages(path, author, company, "3")
}

/// Igual que `write_docx`, con el texto literal del elemento `<Pages>`.
pub fn write_docx_with_pages(path: &Path, author: &str, company: &str, pages: &str) -> TestResult {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>
"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#;
    let document = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body><w:p><w:r><w:t>Contrato</w:t></w:r></w:p></w:body>
</w:document>
"#;
    let core = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:creator>{author}</dc:creator>
    <cp:lastModifiedBy>{author}</cp:lastModifiedBy>
    <dcterms:created xsi:type="dcterms:W3CDTF">2024-03-01T09:00:00Z</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">2024-03-02T18:45:00Z</dcterms:modified>
    <dc:title>Contrato de servicios</dc:title>
    <cp:revision>4</cp:revision>
</cp:coreProperties>
"#
    );
    let app = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
    <Application>Microsoft Office Word</Application>
    <Company>{company}</Company>
    <Pages>{pages}</Pages>
</Properties>
"#
    );
    let custom = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties"
            xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="Cliente">
        <vt:lpwstr>Cliente Reservado</vt:lpwstr>
    </property>
</Properties>
"#;

    let mut writer = ZipWriter::new(File::create(path)?);
    let options = FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in [
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", rels),
        ("word/document.xml", document),
        ("docProps/core.xml", core.as_str()),
        ("docProps/app.xml", app.as_str()),
        ("docProps/custom.xml", custom),
    ] {
        writer.start_file(name, options)?;
        writer.write_all(contents.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}

/// PDF de una página con diccionario Info.
pub fn write_pdf(path: &Path, author: &str, creation_date: &str) -> TestResult {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 300.into(), 300.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Author" => Object::string_literal(author),
        "Producer" => Object::string_literal("Generador de Pruebas 1.0"),
        "CreationDate" => Object::string_literal(creation_date),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.save(path)?;
    Ok(())
}

fn id3_text_frame(id: &[u8; 4], text: &str) -> Vec<u8> {
    let mut frame = id.to_vec();
    frame.extend_from_slice(&(text.len() as u32 + 1).to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0x03]);
    frame.extend_from_slice(text.as_bytes());
    frame
}

/// MP3 con etiqueta ID3v2.3 (título, artista) y un marco MPEG de 128 kbps.
pub fn write_mp3_with_id3(path: &Path) -> TestResult {
    let body = [
        id3_text_frame(b"TIT2", "Entrevista"),
        id3_text_frame(b"TPE1", "Ana Ruiz"),
    ]
    .concat();
    let size = body.len() as u32;
    let mut data = b"ID3\x03\x00\x00".to_vec();
    data.extend_from_slice(&[
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ]);
    data.extend_from_slice(&body);
    data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    data.extend_from_slice(&[0_u8; 413]);
    std::fs::write(path, data)?;
    Ok(())
}

fn mp4_box(kind: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut data = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    data.extend_from_slice(kind);
    data.extend_from_slice(payload);
    data
}

fn quicktime_text(kind: &[u8], text: &str) -> Vec<u8> {
    let mut payload = (text.len() as u16).to_be_bytes().to_vec();
    payload.extend_from_slice(&[0x15, 0xC7]);
    payload.extend_from_slice(text.as_bytes());
    mp4_box(kind, &payload)
}

fn mp4_ftyp() -> Vec<u8> {
    mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2")
}

/// MP4 creado el 2020-01-01, de 5 s, grabado por "Apple" en +40.7488-073.9837.
pub fn write_mp4_with_location(path: &Path) -> TestResult {
    // Segundos desde 1904-01-01 hasta 2020-01-01.
    const CREATED: u32 = 3_660_681_600;
    let mut mvhd = vec![0_u8; 100];
    mvhd[4..8].copy_from_slice(&CREATED.to_be_bytes());
    mvhd[8..12].copy_from_slice(&CREATED.to_be_bytes());
    mvhd[12..16].copy_from_slice(&1000_u32.to_be_bytes());
    mvhd[16..20].copy_from_slice(&5000_u32.to_be_bytes());

    let udta = mp4_box(
        b"udta",
        &[
            quicktime_text(&[0xA9, b'x', b'y', b'z'], "+40.7488-073.9837/"),
            quicktime_text(&[0xA9, b'm', b'a', b'k'], "Apple"),
        ]
        .concat(),
    );
    let moov = mp4_box(b"moov", &[mp4_box(b"mvhd", &mvhd), udta].concat());
    let mdat = mp4_box(b"mdat", &[0_u8; 32]);
    std::fs::write(path, [mp4_ftyp(), moov, mdat].concat())?;
    Ok(())
}

/// MP4 cuya segunda caja declara un tamaño de 64 bits imposible.
pub fn write_mp4_with_oversized_box(path: &Path) -> TestResult {
    let mut free = 1_u32.to_be_bytes().to_vec();
    free.extend_from_slice(b"free");
    free.extend_from_slice(&(u64::MAX - 15).to_be_bytes());
    free.extend_from_slice(&[0_u8; 24]);
    std::fs::write(path, [mp4_ftyp(), free].concat())?;
    Ok(())
}

fn riff_text(id: &[u8; 4], text: &str) -> Vec<u8> {
    let mut value = text.as_bytes().to_vec();
    value.push(0);
    let mut entry = id.to_vec();
    entry.extend_from_slice(&(value.len() as u32).to_le_bytes());
    entry.extend_from_slice(&value);
    if value.len() % 2 == 1 {
        entry.push(0);
    }
    entry
}

/// WAV PCM mono de 1 s a 8 kHz con lista INFO (título, artista, software).
pub fn write_wav_with_info(path: &Path) -> TestResult {
    let mut fmt = Vec::new();
    fmt.extend_from_slice(&1_u16.to_le_bytes());
    fmt.extend_from_slice(&1_u16.to_le_bytes());
    fmt.extend_from_slice(&8000_u32.to_le_bytes());
    fmt.extend_from_slice(&16_000_u32.to_le_bytes());
    fmt.extend_from_slice(&2_u16.to_le_bytes());
    fmt.extend_from_slice(&16_u16.to_le_bytes());

    let mut info = b"INFO".to_vec();
    info.extend_from_slice(&riff_text(b"INAM", "Entrevista"));
    info.extend_from_slice(&riff_text(b"IART", "Ana Ruiz"));
    info.extend_from_slice(&riff_text(b"ISFT", "Audacity"));

    let mut body = b"WAVE".to_vec();
    for (id, chunk) in [
        (b"fmt ", fmt),
        (b"LIST", info),
        (b"data", vec![0_u8; 16_000]),
    ] {
        body.extend_from_slice(id);
        body.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        body.extend_from_slice(&chunk);
    }
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&(body.len() as u32).to_le_bytes());
    data.extend_from_slice(&body);
    std::fs::write(path, data)?;
    Ok(())
}

/// FLAC estéreo de 10 s a 44,1 kHz con comentarios Vorbis.
pub fn write_flac_with_vorbis(path: &Path, comments: &[&str]) -> TestResult {
    let mut streaminfo = vec![0_u8; 34];
    streaminfo[10..14].copy_from_slice(&[0x0A, 0xC4, 0x42, 0xF0]);
    streaminfo[14..18].copy_from_slice(&441_000_u32.to_be_bytes());

    let vendor = b"reference libFLAC 1.4.3";
    let mut vorbis = (vendor.len() as u32).to_le_bytes().to_vec();
    vorbis.extend_from_slice(vendor);
    vorbis.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        vorbis.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        vorbis.extend_from_slice(comment.as_bytes());
    }

    let mut data = b"fLaC".to_vec();
    for (header, block) in [(0x00_u8, streaminfo), (0x84, vorbis)] {
        data.push(header);
        data.extend_from_slice(&(block.len() as u32).to_be_bytes()[1..]);
        data.extend_from_slice(&block);
    }
    data.extend_from_slice(&[0xFF, 0xF8, 0x69, 0x08]);
    std::fs::write(path, data)?;
    Ok(())
}
