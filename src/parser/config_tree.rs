//! Flattening of nested XML configuration into ordered key/value pairs.
//!
//! Keys are dot-separated element paths ending in the attribute name, e.g.
//! `connection.host`. Sibling elements that repeat get a `[n]` index.
//! Element text is stored under the element's own path.

use crate::record::{ConfigMap, ConfigValue};
use crate::xml::{XmlElement, local_part};
use ahash::AHashMap;

/// Dialect hooks applied while flattening.
pub(crate) trait ConfigDialect {
    /// Classifies one raw attribute or text value.
    fn value(&self, raw: &str) -> ConfigValue {
        ConfigValue::literal(raw)
    }

    /// Collapses `element` into a single entry `(key segment, value)` instead of
    /// flattening it. `None` flattens normally.
    fn leaf(&self, _element: &XmlElement) -> Option<(String, ConfigValue)> {
        None
    }

    /// Whether a child element belongs to the configuration tree. Nested
    /// processors are excluded here and parsed as records of their own.
    fn descend(&self, _element: &XmlElement) -> bool {
        true
    }

    /// Whether an attribute is kept. Namespace declarations are always dropped.
    fn keep_attribute(&self, _name: &str) -> bool {
        true
    }
}

/// Appends every attribute, text and descendant of `element` to `out`.
pub(crate) fn flatten_into(
    element: &XmlElement,
    prefix: &str,
    dialect: &dyn ConfigDialect,
    out: &mut ConfigMap,
) {
    for (name, raw) in &element.attributes {
        if name == "xmlns" || name.starts_with("xmlns:") || !dialect.keep_attribute(name) {
            continue;
        }
        out.insert(join(prefix, local_part(name)), dialect.value(raw));
    }

    let text = element.text();
    if !text.is_empty() {
        let key = if prefix.is_empty() {
            "text".to_string()
        } else {
            prefix.to_string()
        };
        out.insert(key, dialect.value(&text));
    }

    let mut totals: AHashMap<&str, usize> = AHashMap::new();
    for child in element.elements().filter(|c| dialect.descend(c)) {
        *totals.entry(child.local_name()).or_insert(0) += 1;
    }

    let mut seen: AHashMap<&str, usize> = AHashMap::new();
    for child in element.elements().filter(|c| dialect.descend(c)) {
        let local = child.local_name();
        let position = seen.entry(local).or_insert(0);
        let segment = if totals.get(local).copied().unwrap_or(0) > 1 {
            format!("{}[{}]", local, position)
        } else {
            local.to_string()
        };
        *position += 1;

        match dialect.leaf(child) {
            Some((key, value)) => {
                out.insert(join(prefix, &key), value);
            }
            None => flatten_into(child, &join(prefix, &segment), dialect, out),
        }
    }
}

pub(crate) fn flatten(element: &XmlElement, dialect: &dyn ConfigDialect) -> ConfigMap {
    let mut out = ConfigMap::new();
    flatten_into(element, "", dialect, &mut out);
    out
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}
