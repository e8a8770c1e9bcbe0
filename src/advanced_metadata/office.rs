//! Lectura de metadata en documentos Office empaquetados en ZIP.

use std::io::{Read, Seek};

use tracing::debug;
use xmltree::{Element, XMLNode};
use zip::ZipArchive;

use super::dates::parse_iso_date;
use super::{ExtractedFields, FieldExtractor, SeekRead};
use crate::metadata_editor::constants::{APP_NS, CP_NS, DC_NS, DCTERMS_NS};
use crate::probe::FormatProbe;
use crate::record::{FieldGroup, FormatKind, keys};

#[derive(Clone, Copy)]
enum ValueKind {
    Text,
    Date,
    Number,
}

struct FieldSpec {
    key: &'static str,
    local_name: &'static str,
    namespace: Option<&'static str>,
    kind: ValueKind,
}

const fn spec(
    key: &'static str,
    local_name: &'static str,
    namespace: &'static str,
    kind: ValueKind,
) -> FieldSpec {
    FieldSpec {
        key,
        local_name,
        namespace: Some(namespace),
        kind,
    }
}

const CORE_FIELDS: [FieldSpec; 11] = [
    spec(keys::AUTHOR, "creator", DC_NS, ValueKind::Text),
    spec(keys::LAST_MODIFIED_BY, "lastModifiedBy", CP_NS, ValueKind::Text),
    spec(keys::EMBEDDED_CREATED_AT, "created", DCTERMS_NS, ValueKind::Date),
    spec(keys::EMBEDDED_MODIFIED_AT, "modified", DCTERMS_NS, ValueKind::Date),
    spec(keys::TITLE, "title", DC_NS, ValueKind::Text),
    spec(keys::SUBJECT, "subject", DC_NS, ValueKind::Text),
    spec(keys::COMMENTS, "description", DC_NS, ValueKind::Text),
    spec(keys::KEYWORDS, "keywords", CP_NS, ValueKind::Text),
    spec("office.category", "category", CP_NS, ValueKind::Text),
    spec("office.contentStatus", "contentStatus", CP_NS, ValueKind::Text),
    spec("office.revision", "revision", CP_NS, ValueKind::Text),
];

const APP_FIELDS: [FieldSpec; 11] = [
    spec(keys::SOFTWARE, "Application", APP_NS, ValueKind::Text),
    spec("office.app.version", "AppVersion", APP_NS, ValueKind::Text),
    spec("office.app.template", "Template", APP_NS, ValueKind::Text),
    spec("office.app.totalEditMinutes", "TotalTime", APP_NS, ValueKind::Number),
    spec(keys::ORGANIZATION, "Company", APP_NS, ValueKind::Text),
    spec(keys::MANAGER, "Manager", APP_NS, ValueKind::Text),
    spec(keys::PAGE_COUNT, "Pages", APP_NS, ValueKind::Number),
    spec("office.stats.slides", "Slides", APP_NS, ValueKind::Number),
    spec("office.stats.words", "Words", APP_NS, ValueKind::Number),
    spec("office.stats.lines", "Lines", APP_NS, ValueKind::Number),
    spec("office.stats.characters", "Characters", APP_NS, ValueKind::Number),
];

/// Formatos binarios OLE2 detectados por firma pero sin decodificador.
const LEGACY_SUBTYPES: [&str; 3] = ["doc", "xls", "ppt"];

pub struct OfficeExtractor;

impl FieldExtractor for OfficeExtractor {
    fn family(&self) -> FormatKind {
        FormatKind::OfficeDocument
    }

    fn extract_fields(&self, reader: &mut dyn SeekRead, probe: &FormatProbe) -> ExtractedFields {
        let mut output = ExtractedFields::default();
        if LEGACY_SUBTYPES.contains(&probe.subtype()) {
            output.partial(
                FieldGroup::Container,
                format!("formato OLE2 `{}` sin decodificador", probe.subtype()),
            );
            return output;
        }

        let mut archive = match ZipArchive::new(reader) {
            Ok(archive) => archive,
            Err(error) => {
                output.partial(
                    FieldGroup::Container,
                    format!("paquete OOXML ilegible: {error}"),
                );
                return output;
            }
        };

        let core = read_part(
            &mut archive,
            "docProps/core.xml",
            FieldGroup::Descriptive,
            &mut output,
        );
        if let Some(root) = core {
            collect_fields(&root, &CORE_FIELDS, &mut output);
        }
        let app = read_part(
            &mut archive,
            "docProps/app.xml",
            FieldGroup::Application,
            &mut output,
        );
        if let Some(root) = app {
            collect_fields(&root, &APP_FIELDS, &mut output);
        }
        if let Some(root) = read_part(
            &mut archive,
            "docProps/custom.xml",
            FieldGroup::CustomProperties,
            &mut output,
        ) {
            for (name, value) in extract_custom_properties(&root) {
                output.insert_text(format!("office.custom.{name}"), &value);
            }
        }
        output
    }
}

/// Lee y analiza una parte XML. Una parte ausente no es un error; una
/// ilegible queda como error parcial del grupo indicado.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    group: FieldGroup,
    output: &mut ExtractedFields,
) -> Option<Element> {
    let mut part = archive.by_name(name).ok()?;
    let mut contents = String::new();
    if let Err(error) = part.read_to_string(&mut contents) {
        output.partial(group, format!("No se pudo leer {name}: {error}"));
        return None;
    }
    match Element::parse(contents.as_bytes()) {
        Ok(root) => Some(root),
        Err(error) => {
            debug!(part = name, %error, "XML de propiedades mal formado");
            output.partial(group, format!("XML mal formado en {name}: {error}"));
            None
        }
    }
}

fn collect_fields(root: &Element, fields: &[FieldSpec], output: &mut ExtractedFields) {
    for field in fields {
        let Some(value) = find_child_text(root, field.local_name, field.namespace) else {
            continue;
        };
        match field.kind {
            ValueKind::Text => output.insert_text(field.key, &value),
            // Las fechas vacías equivalen a ausencia.
            ValueKind::Date if value.is_empty() => {}
            ValueKind::Date => output.insert_date(field.key, &value, parse_iso_date(&value)),
            ValueKind::Number => match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => output.insert_number(field.key, number),
                _ => output.partial(
                    FieldGroup::of_key(field.key),
                    format!("valor numérico `{value}` ilegible en {}", field.key),
                ),
            },
        }
    }
}

fn find_child_text(root: &Element, local_name: &str, namespace: Option<&str>) -> Option<String> {
    for node in &root.children {
        if let XMLNode::Element(child) = node
            && child.name == local_name
            && namespace_matches(child, namespace)
        {
            return Some(element_text_content(child));
        }
    }
    None
}

fn namespace_matches(element: &Element, namespace: Option<&str>) -> bool {
    match (namespace, element.namespace.as_deref()) {
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        if let XMLNode::Text(text) = node {
            content.push_str(text);
        }
    }
    content.trim().to_string()
}

fn extract_custom_properties(root: &Element) -> Vec<(String, String)> {
    let mut props = Vec::new();
    for node in &root.children {
        if let XMLNode::Element(child) = node {
            if child.name != "property" {
                continue;
            }
            let name = match child.attributes.get("name") {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => continue,
            };
            let value = child
                .children
                .iter()
                .find_map(|node| match node {
                    XMLNode::Element(value_node) => Some(element_text_content(value_node)),
                    _ => None,
                })
                .unwrap_or_default();
            props.push((name, value));
        }
    }
    props
}
