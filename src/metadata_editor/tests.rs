use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use lopdf::{Document, Object, Stream, dictionary};
use tempfile::tempdir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{
    ImageSanitizer, OfficeSanitizer, PdfSanitizer, Sanitizer, sanitize_file, sanitizer_for,
    strip_in_place,
};
use crate::error::ForensicError;
use crate::record::{FormatKind, keys};

#[test]
fn office_strip_clears_docprops() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("sample.docx");
    create_sample_docx(&source)?;

    strip_in_place(&OfficeSanitizer, &source)?;

    assert!(source.exists());
    assert!(OfficeSanitizer.verify(&source)?);

    let mut archive = ZipArchive::new(File::open(&source)?)?;

    let mut core_contents = String::new();
    archive
        .by_name("docProps/core.xml")?
        .read_to_string(&mut core_contents)?;
    assert!(!core_contents.contains("Autor Prueba"));
    assert!(!core_contents.contains("Editor Prueba"));
    assert!(!core_contents.contains("dcterms:created"));
    assert!(core_contents.contains("<cp:revision>1</cp:revision>"));

    let mut app_contents = String::new();
    archive
        .by_name("docProps/app.xml")?
        .read_to_string(&mut app_contents)?;
    assert!(!app_contents.contains("Microsoft Word"));
    assert!(!app_contents.contains("Compania Demo"));
    assert!(app_contents.contains("<Pages>0</Pages>"));

    let mut custom_contents = String::new();
    archive
        .by_name("docProps/custom.xml")?
        .read_to_string(&mut custom_contents)?;
    assert!(custom_contents.trim().ends_with("docPropsVTypes\"/>"));

    let mut document = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut document)?;
    assert!(document.contains("Documento de prueba"));

    Ok(())
}

#[test]
fn office_verify_flags_dirty_package() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("sample.docx");
    create_sample_docx(&source)?;

    assert!(!OfficeSanitizer.verify(&source)?);

    Ok(())
}

#[test]
fn sanitize_file_reports_removed_fields() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("informe.docx");
    create_sample_docx(&source)?;

    let outcome = sanitize_file(&source)?;

    assert_eq!(outcome.format_kind, FormatKind::OfficeDocument);
    for key in [
        keys::AUTHOR,
        keys::LAST_MODIFIED_BY,
        keys::ORGANIZATION,
        keys::SOFTWARE,
        keys::EMBEDDED_CREATED_AT,
        "office.custom.CustomField",
    ] {
        assert!(
            outcome.removed_fields.iter().any(|k| k == key),
            "{key} debería haberse eliminado"
        );
        assert!(!outcome.remaining_fields.iter().any(|k| k == key));
    }
    assert!(outcome.changed_fields.iter().any(|k| k == "office.revision"));
    assert!(!outcome.geo_removed);
    assert!(!outcome.is_unchanged());

    Ok(())
}

#[test]
fn sanitizing_twice_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("informe.docx");
    create_sample_docx(&source)?;

    sanitize_file(&source)?;
    let second = sanitize_file(&source)?;

    assert!(second.is_unchanged());

    Ok(())
}

#[test]
fn pdf_strip_drops_info_and_xmp() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("contrato.pdf");
    create_sample_pdf(&source)?;

    assert!(!PdfSanitizer.verify(&source)?);
    strip_in_place(&PdfSanitizer, &source)?;

    let doc = Document::load(&source)?;
    assert!(!doc.trailer.has(b"Info"));
    assert!(!doc.catalog()?.has(b"Metadata"));
    assert_eq!(doc.get_pages().len(), 1);

    Ok(())
}

#[test]
fn image_strip_keeps_pixels() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("foto.png");
    image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10])).save(&source)?;

    strip_in_place(&ImageSanitizer, &source)?;

    let decoded = image::open(&source)?.to_rgb8();
    assert_eq!(decoded.dimensions(), (4, 3));
    assert_eq!(decoded.get_pixel(0, 0), &image::Rgb([200, 10, 10]));
    assert!(ImageSanitizer.verify(&source)?);

    Ok(())
}

#[test]
fn failed_strip_leaves_original_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("roto.docx");
    std::fs::write(&source, b"esto no es un zip")?;

    assert!(strip_in_place(&OfficeSanitizer, &source).is_err());
    assert_eq!(std::fs::read(&source)?, b"esto no es un zip");
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);

    Ok(())
}

#[test]
fn media_and_unknown_files_have_no_sanitizer() -> Result<(), Box<dyn std::error::Error>> {
    assert!(sanitizer_for(FormatKind::MediaFile).is_none());
    assert!(sanitizer_for(FormatKind::Unknown).is_none());
    assert_eq!(
        sanitizer_for(FormatKind::PdfDocument).map(|s| s.family()),
        Some(FormatKind::PdfDocument)
    );

    let dir = tempdir()?;
    let source = dir.path().join("notas.txt");
    std::fs::write(&source, "texto plano")?;
    assert!(matches!(
        sanitize_file(&source),
        Err(ForensicError::Sanitize { .. })
    ));

    Ok(())
}

fn create_sample_pdf(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
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
    let xmp_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>".to_vec(),
    ));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "Metadata" => xmp_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Author" => Object::string_literal("Autor Prueba"),
        "Producer" => Object::string_literal("Generador Demo"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.save(path)?;
    Ok(())
}

fn create_sample_docx(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
    <Override PartName="/docProps/custom.xml" ContentType="application/vnd.openxmlformats-officedocument.custom-properties+xml"/>
</Types>
"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body>
        <w:p><w:r><w:t>Documento de prueba</w:t></w:r></w:p>
    </w:body>
</w:document>
"#;

    const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/"
                   xmlns:dcmitype="http://purl.org/dc/dcmitype/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:creator>Autor Prueba</dc:creator>
    <cp:lastModifiedBy>Editor Prueba</cp:lastModifiedBy>
    <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-01T00:00:00Z</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">2024-02-01T00:00:00Z</dcterms:modified>
    <dc:title>Documento Demo</dc:title>
    <dc:subject>Asunto Demo</dc:subject>
    <cp:revision>6</cp:revision>
</cp:coreProperties>
"#;

    const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"
            xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>Microsoft Word</Application>
    <Company>Compania Demo</Company>
    <Pages>2</Pages>
    <Words>345</Words>
    <Lines>12</Lines>
</Properties>
"#;

    const CUSTOM_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties"
            xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="CustomField">
        <vt:lpwstr>Dato Confidencial</vt:lpwstr>
    </property>
</Properties>
"#;

    let file = File::create(path)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Stored);

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(CONTENT_TYPES.as_bytes())?;

    writer.start_file("_rels/.rels", options)?;
    writer.write_all(RELS_XML.as_bytes())?;

    writer.start_file("word/document.xml", options)?;
    writer.write_all(DOCUMENT_XML.as_bytes())?;

    writer.start_file("docProps/core.xml", options)?;
    writer.write_all(CORE_XML.as_bytes())?;

    writer.start_file("docProps/app.xml", options)?;
    writer.write_all(APP_XML.as_bytes())?;

    writer.start_file("docProps/custom.xml", options)?;
    writer.write_all(CUSTOM_XML.as_bytes())?;

    writer.finish()?;

    Ok(())
}
