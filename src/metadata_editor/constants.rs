//! Espacios de nombres OOXML y propiedades que el saneamiento elimina.

pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const APP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyUpdate {
    /// El elemento desaparece del XML.
    Remove,
    /// El elemento se conserva con un valor neutro.
    Set(&'static str),
}

pub const CORE_SANITIZE_FIELDS: [(&str, PropertyUpdate); 11] = [
    ("dc:creator", PropertyUpdate::Remove),
    ("cp:lastModifiedBy", PropertyUpdate::Remove),
    ("dcterms:created", PropertyUpdate::Remove),
    ("dcterms:modified", PropertyUpdate::Remove),
    ("dc:title", PropertyUpdate::Remove),
    ("dc:subject", PropertyUpdate::Remove),
    ("dc:description", PropertyUpdate::Remove),
    ("cp:keywords", PropertyUpdate::Remove),
    ("cp:category", PropertyUpdate::Remove),
    ("cp:contentStatus", PropertyUpdate::Remove),
    ("cp:revision", PropertyUpdate::Set("1")),
];

pub const APP_SANITIZE_FIELDS: [(&str, PropertyUpdate); 9] = [
    ("Application", PropertyUpdate::Remove),
    ("AppVersion", PropertyUpdate::Remove),
    ("Company", PropertyUpdate::Remove),
    ("Manager", PropertyUpdate::Remove),
    ("Template", PropertyUpdate::Remove),
    ("TotalTime", PropertyUpdate::Remove),
    ("Pages", PropertyUpdate::Set("0")),
    ("Words", PropertyUpdate::Set("0")),
    ("Lines", PropertyUpdate::Set("0")),
];

pub const CUSTOM_PROPERTIES_EMPTY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/custom-properties\" xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\"/>\n";
