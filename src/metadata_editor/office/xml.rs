use xmltree::{Element, XMLNode};

use crate::metadata_editor::constants::{APP_NS, CP_NS, DC_NS, DCTERMS_NS, PropertyUpdate};

/// Describe la información necesaria para localizar un nodo en el XML de propiedades.
#[derive(Clone, Copy)]
pub(crate) struct FieldSpec<'a> {
    pub(crate) prefix: Option<&'a str>,
    pub(crate) local_name: &'a str,
    pub(crate) namespace: Option<&'a str>,
}

/// Campo de `core.xml` a partir de su etiqueta con prefijo (`dc:creator`).
pub(crate) fn core_field_spec(tag: &str) -> Option<FieldSpec<'_>> {
    let (prefix, local_name) = tag.split_once(':')?;
    let namespace = match prefix {
        "dc" => DC_NS,
        "cp" => CP_NS,
        "dcterms" => DCTERMS_NS,
        _ => return None,
    };
    Some(FieldSpec {
        prefix: Some(prefix),
        local_name,
        namespace: Some(namespace),
    })
}

/// Campo de `app.xml`; todos viven en el espacio de nombres por defecto.
pub(crate) fn app_field_spec(tag: &str) -> Option<FieldSpec<'_>> {
    if tag.is_empty() || tag.contains(':') {
        return None;
    }
    Some(FieldSpec {
        prefix: None,
        local_name: tag,
        namespace: Some(APP_NS),
    })
}

/// Aplica una actualización y devuelve si el árbol cambió.
pub(crate) fn apply_update(root: &mut Element, spec: FieldSpec<'_>, update: PropertyUpdate) -> bool {
    match update {
        PropertyUpdate::Remove => remove_element(root, &spec),
        PropertyUpdate::Set(value) => apply_update_to_element(root, spec, value),
    }
}

fn remove_element(root: &mut Element, spec: &FieldSpec<'_>) -> bool {
    let before = root.children.len();
    root.children
        .retain(|node| !matches!(node, XMLNode::Element(child) if element_matches(child, spec)));
    root.children.len() != before
}

/// Inserta o sustituye el contenido de un elemento de metadata.
fn apply_update_to_element(root: &mut Element, spec: FieldSpec<'_>, new_value: &str) -> bool {
    for node in root.children.iter_mut() {
        if let XMLNode::Element(child) = node
            && element_matches(child, &spec)
        {
            return set_element_text(child, new_value);
        }
    }

    let mut new_child = Element::new(spec.local_name);
    new_child.prefix = spec.prefix.map(str::to_string);
    new_child.namespace = spec.namespace.map(str::to_string);
    if !new_value.is_empty() {
        new_child
            .children
            .push(XMLNode::Text(new_value.to_string()));
    }
    root.children.push(XMLNode::Element(new_child));
    true
}

pub(crate) fn element_matches(element: &Element, spec: &FieldSpec<'_>) -> bool {
    if element.name != spec.local_name {
        return false;
    }

    match (spec.namespace, element.namespace.as_deref()) {
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// Sustituye el texto de un elemento si difiere del valor actual.
fn set_element_text(element: &mut Element, new_value: &str) -> bool {
    if element_text_content(element) == new_value {
        return false;
    }

    element
        .children
        .retain(|node| !matches!(node, XMLNode::Text(_)));

    if !new_value.is_empty() {
        element.children.push(XMLNode::Text(new_value.to_string()));
    }

    true
}

pub(crate) fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        if let XMLNode::Text(text) = node {
            content.push_str(text);
        }
    }
    content.trim().to_string()
}

/// Comprueba que el árbol refleja la actualización esperada.
pub(crate) fn update_applied(root: &Element, spec: FieldSpec<'_>, update: PropertyUpdate) -> bool {
    let found = root.children.iter().find_map(|node| match node {
        XMLNode::Element(child) if element_matches(child, &spec) => Some(child),
        _ => None,
    });
    match (update, found) {
        (PropertyUpdate::Remove, found) => found.is_none(),
        (PropertyUpdate::Set(expected), Some(child)) => element_text_content(child) == expected,
        (PropertyUpdate::Set(_), None) => false,
    }
}
