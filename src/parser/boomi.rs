use super::config_tree::{self, ConfigDialect};
use super::{ParseContext, SourceParser};
use crate::model::EdgeKind;
use crate::record::{ComponentRecord, ConfigValue, DialectId, RecordLink, RecordRole};
use crate::xml::XmlElement;
use ahash::AHashSet;
use tracing::warn;

/// Parser for Boomi process components (`<bns:Component type="process">`).
///
/// Every `shape` is a record keyed by its shape name (`shape1`, ...), and every
/// `dragpoint` is a link to the shape named in `toShape`.
pub struct BoomiParser;

/// `parametervalue` types that bind to data rather than carry a literal.
const REFERENCE_VALUE_TYPES: &[&str] = &["profile", "track", "process"];

struct BoomiConfig;

impl ConfigDialect for BoomiConfig {
    fn leaf(&self, element: &XmlElement) -> Option<(String, ConfigValue)> {
        if element.local_name() != "parametervalue" {
            return None;
        }
        let key = element
            .attr_non_empty("key")
            .or_else(|| element.attr_non_empty("name"))?
            .to_string();
        let value_type = element.attr("valueType").unwrap_or("static");
        let detail = element.elements().next();

        if REFERENCE_VALUE_TYPES.contains(&value_type) {
            let target = detail.and_then(|d| {
                ["elementName", "propertyName", "propertyId", "name", "key"]
                    .iter()
                    .find_map(|attr| d.attr_non_empty(attr))
            });
            let path = match target {
                Some(target) => format!("{}/{}", value_type, target),
                None => value_type.to_string(),
            };
            return Some((key, ConfigValue::reference(path)));
        }

        let literal = detail
            .and_then(|d| {
                d.attributes
                    .iter()
                    .map(|(_, v)| v.as_str())
                    .find(|v| !v.trim().is_empty())
            })
            .map(str::to_string)
            .or_else(|| Some(element.text()))
            .unwrap_or_default();
        Some((key, ConfigValue::literal(literal)))
    }
}

fn role_of(shapetype: &str) -> RecordRole {
    match shapetype {
        "start" => RecordRole::Start,
        "stop" | "returndocuments" | "exception" => RecordRole::End,
        _ => RecordRole::Step,
    }
}

/// Try/catch shapes route their catch branch through an error dragpoint.
fn dragpoint_kind(shapetype: &str, dragpoint: &XmlElement) -> EdgeKind {
    if shapetype != "trycatch" {
        return EdgeKind::Sequence;
    }
    let is_catch = [dragpoint.attr("identifier"), dragpoint.attr("text")]
        .into_iter()
        .flatten()
        .any(|v| matches!(v.trim().to_lowercase().as_str(), "error" | "catch"));
    if is_catch {
        EdgeKind::Error
    } else {
        EdgeKind::Sequence
    }
}

impl SourceParser for BoomiParser {
    fn dialect(&self) -> DialectId {
        DialectId::Boomi
    }

    fn parse_tree(&self, root: &XmlElement, ctx: &mut ParseContext<'_>) -> Vec<ComponentRecord> {
        if root.local_name() != "Component" {
            ctx.warn(
                root,
                format!("Expected a <bns:Component> root element, found <{}>", root.name),
            );
            return Vec::new();
        }
        if let Some(kind) = root.attr("type").filter(|t| *t != "process") {
            ctx.warn(
                root,
                format!("Component type '{}' is not a process; no shapes read", kind),
            );
            return Vec::new();
        }
        let Some(shapes) = root.descendant("shapes") else {
            ctx.warn(root, "Process has no <shapes> element");
            return Vec::new();
        };

        let mut records = Vec::new();
        let mut skipped: AHashSet<String> = AHashSet::new();
        for shape in shapes.find_all("shape") {
            let id = shape.attr_non_empty("name");
            let shapetype = shape.attr_non_empty("shapetype");
            let (Some(id), Some(shapetype)) = (id, shapetype) else {
                if let Some(id) = id {
                    skipped.insert(id.to_string());
                }
                ctx.warn(shape, "Shape without a name or shapetype was skipped");
                continue;
            };
            records.push(self.shape_record(shape, id, shapetype, ctx));
        }

        // Links into skipped shapes are dropped; any other unknown target is
        // left for the model builder to reject.
        let document = ctx.document();
        for record in &mut records {
            let from = record.id.clone();
            record.links.retain(|link| {
                let keep = !skipped.contains(&link.target);
                if !keep {
                    warn!(document, %from, to = %link.target, "dropped link to skipped shape");
                }
                keep
            });
        }
        records
    }
}

impl BoomiParser {
    fn shape_record(
        &self,
        shape: &XmlElement,
        id: &str,
        shapetype: &str,
        ctx: &mut ParseContext<'_>,
    ) -> ComponentRecord {
        let name = shape
            .attr_non_empty("userlabel")
            .or_else(|| shape.attr_non_empty("label"))
            .unwrap_or(shapetype);
        let mut record = ComponentRecord::new(id, name, shapetype, ctx.document(), DialectId::Boomi)
            .with_role(role_of(shapetype));

        if let Some(configuration) = shape.find("configuration") {
            if let Some(connector) = configuration
                .elements()
                .find_map(|e| e.attr_non_empty("connectorType"))
            {
                record = record.with_variant(connector);
            }
            record.config = config_tree::flatten(configuration, &BoomiConfig);
        }

        if let Some(dragpoints) = shape.find("dragpoints") {
            for dragpoint in dragpoints.find_all("dragpoint") {
                let Some(target) = dragpoint
                    .attr_non_empty("toShape")
                    .filter(|t| *t != "unset")
                else {
                    ctx.warn(
                        dragpoint,
                        format!("Dragpoint of shape '{}' is not connected", id),
                    );
                    continue;
                };
                let condition = dragpoint
                    .attr_non_empty("text")
                    .or_else(|| dragpoint.attr_non_empty("identifier"))
                    .map(str::to_string);
                let kind = dragpoint_kind(shapetype, dragpoint);
                record = record.with_link(RecordLink::new(target, kind).with_condition(condition));
            }
        }

        record.raw_content = ctx.raw(shape);
        record
    }
}
