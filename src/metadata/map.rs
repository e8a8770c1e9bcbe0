//! Mapa de las posiciones embebidas en el lote.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use xmltree::{Element, EmitterConfig, Namespace, XMLNode};

use crate::error::ReportError;
use crate::record::{FileRecord, GeoPoint};

#[derive(Clone, Debug, PartialEq)]
pub struct MapPoint {
    pub path: PathBuf,
    pub geo: GeoPoint,
    pub sha256: String,
}

pub trait MapRenderer {
    fn render(&mut self, points: &[MapPoint]) -> Result<(), ReportError>;
}

/// Elige el renderizador por la extensión de destino: `.kml` produce KML y
/// cualquier otra ruta GeoJSON.
pub fn map_for<'w, W: Write + 'w>(path: &Path, writer: W) -> Box<dyn MapRenderer + 'w> {
    let is_kml = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("kml"));
    if is_kml {
        Box::new(KmlMap::new(writer))
    } else {
        Box::new(GeoJsonMap::new(writer))
    }
}

/// Envía al renderizador solo los registros con posición. Si ninguno tiene
/// posición el renderizador no se invoca. Devuelve cuántos puntos se pintaron.
pub fn render_locations<'a>(
    renderer: &mut dyn MapRenderer,
    records: impl IntoIterator<Item = &'a FileRecord>,
) -> Result<usize, ReportError> {
    let points: Vec<MapPoint> = records
        .into_iter()
        .filter_map(|record| {
            record.position().map(|geo| MapPoint {
                path: record.path.clone(),
                geo,
                sha256: record.content_hashes.sha256.clone(),
            })
        })
        .collect();
    if points.is_empty() {
        return Ok(0);
    }
    renderer.render(&points)?;
    Ok(points.len())
}

/// `FeatureCollection` GeoJSON (RFC 7946) con un `Point` por archivo.
pub struct GeoJsonMap<W: Write> {
    writer: W,
}

impl<W: Write> GeoJsonMap<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn point_name(point: &MapPoint) -> String {
    point
        .path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn feature(point: &MapPoint) -> Value {
    // GeoJSON ordena longitud, latitud y altitud.
    let mut coordinates = vec![point.geo.longitude_deg, point.geo.latitude_deg];
    if let Some(altitude) = point.geo.altitude_meters {
        coordinates.push(altitude);
    }
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": coordinates },
        "properties": {
            "name": point_name(point),
            "path": point.path.display().to_string(),
            "sha256": point.sha256,
        },
    })
}

impl<W: Write> MapRenderer for GeoJsonMap<W> {
    fn render(&mut self, points: &[MapPoint]) -> Result<(), ReportError> {
        let collection = json!({
            "type": "FeatureCollection",
            "features": points.iter().map(feature).collect::<Vec<_>>(),
        });
        serde_json::to_writer_pretty(&mut self.writer, &collection)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Documento KML 2.2 con un `Placemark` por archivo, legible por Google Earth.
pub struct KmlMap<W: Write> {
    writer: W,
}

impl<W: Write> KmlMap<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn text_element(name: &str, text: impl Into<String>) -> XMLNode {
    let mut element = Element::new(name);
    element.children.push(XMLNode::Text(text.into()));
    XMLNode::Element(element)
}

fn placemark(point: &MapPoint) -> XMLNode {
    // KML también ordena longitud, latitud y altitud.
    let mut coordinates = format!("{},{}", point.geo.longitude_deg, point.geo.latitude_deg);
    let mut geometry = Element::new("Point");
    if let Some(altitude) = point.geo.altitude_meters {
        coordinates.push_str(&format!(",{altitude}"));
        geometry.children.push(text_element("altitudeMode", "absolute"));
    }
    geometry.children.push(text_element("coordinates", coordinates));

    let mut placemark = Element::new("Placemark");
    placemark.children.push(text_element("name", point_name(point)));
    placemark.children.push(text_element(
        "description",
        format!("{}\nSHA-256: {}", point.path.display(), point.sha256),
    ));
    placemark.children.push(XMLNode::Element(geometry));
    XMLNode::Element(placemark)
}

impl<W: Write> MapRenderer for KmlMap<W> {
    fn render(&mut self, points: &[MapPoint]) -> Result<(), ReportError> {
        let mut document = Element::new("Document");
        document.children.push(text_element("name", "Ubicaciones del lote"));
        document.children.extend(points.iter().map(placemark));

        let mut namespaces = Namespace::empty();
        namespaces.put("", KML_NS);
        let mut root = Element::new("kml");
        root.namespaces = Some(namespaces);
        root.children.push(XMLNode::Element(document));

        let mut config = EmitterConfig::new();
        config.perform_indent = true;
        config.write_document_declaration = true;
        root.write_with_config(&mut self.writer, config)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
