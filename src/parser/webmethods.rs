use super::chain::{Exit, Fragment, RecordSink};
use super::config_tree::{self, ConfigDialect};
use super::{ParseContext, SourceParser};
use crate::model::EdgeKind;
use crate::record::{ComponentRecord, ConfigMap, ConfigValue, DialectId, RecordRole};
use crate::xml::XmlElement;

/// Parser for webMethods flow services (`flow.xml`, `<FLOW>` roots).
///
/// Steps get sequential ids (`step1`, `step2`, ...) in document order. The
/// flow itself contributes a synthetic `start` and `end` record.
pub struct WebMethodsParser;

/// Converts a pipeline path such as `/order;2;0/id;1;0` to `order/id`.
pub(crate) fn pipeline_path(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !raw.starts_with('/') {
        return None;
    }
    let segments: Vec<&str> = raw
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.split(';').next().unwrap_or(s))
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

struct FlowConfig;

impl ConfigDialect for FlowConfig {
    fn value(&self, raw: &str) -> ConfigValue {
        match pipeline_path(raw) {
            Some(path) => ConfigValue::reference(path),
            None => ConfigValue::literal(raw),
        }
    }

    /// Nested steps are records of their own; mapping details are read separately.
    fn descend(&self, element: &XmlElement) -> bool {
        !is_step(element)
            && !matches!(
                element.name.as_str(),
                "COMMENT" | "MAPTARGET" | "MAPSOURCE" | "MAPSET" | "MAPCOPY" | "MAPDELETE" | "MAPINVOKE"
            )
    }
}

const STEPS: &[&str] = &[
    "INVOKE", "MAP", "BRANCH", "LOOP", "REPEAT", "EXIT", "SEQUENCE",
];

fn is_step(element: &XmlElement) -> bool {
    STEPS.contains(&element.name.as_str())
}

struct FlowWalker<'a, 'c> {
    counter: usize,
    sink: RecordSink,
    ctx: &'a mut ParseContext<'c>,
    document: String,
}

impl SourceParser for WebMethodsParser {
    fn dialect(&self) -> DialectId {
        DialectId::WebMethods
    }

    fn parse_tree(&self, root: &XmlElement, ctx: &mut ParseContext<'_>) -> Vec<ComponentRecord> {
        if root.name != "FLOW" {
            ctx.warn(
                root,
                format!("Expected a <FLOW> root element, found <{}>", root.name),
            );
            return Vec::new();
        }

        let document = ctx.document().to_string();
        // `ns/orders/processOrder/flow.xml` is named after its folder.
        let flow_name = document
            .trim_end_matches(".xml")
            .rsplit('/')
            .find(|n| !n.is_empty() && *n != "flow")
            .unwrap_or("Start")
            .to_string();

        let mut walker = FlowWalker {
            counter: 0,
            sink: RecordSink::new(),
            ctx,
            document,
        };

        let mut start = ComponentRecord::new(
            "start",
            flow_name,
            "FLOW",
            walker.document.as_str(),
            DialectId::WebMethods,
        )
        .with_role(RecordRole::Start);
        start.config = root
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), FlowConfig.value(v)))
            .collect();
        let start = walker.sink.push(start);

        let body = walker.steps(root);
        let chained = walker
            .sink
            .sequence(vec![Fragment::single(start), body]);

        let end = ComponentRecord::new(
            "end",
            "End",
            "FLOW",
            walker.document.as_str(),
            DialectId::WebMethods,
        )
        .with_variant("end")
        .with_role(RecordRole::End);
        let end = walker.sink.push(end);
        walker.sink.connect(&chained.exits, &end);

        walker.sink.into_records()
    }
}

impl FlowWalker<'_, '_> {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("step{}", self.counter)
    }

    fn record(&mut self, element: &XmlElement, role: RecordRole) -> String {
        let id = self.next_id();
        let name = element
            .attr_non_empty("NAME")
            .or_else(|| element.attr_non_empty("SERVICE"))
            .map(str::to_string)
            .or_else(|| comment(element))
            .unwrap_or_else(|| element.name.clone());
        let mut record = ComponentRecord::new(
            id,
            name,
            element.name.clone(),
            self.document.as_str(),
            DialectId::WebMethods,
        )
        .with_role(role);

        let mut config = ConfigMap::new();
        config_tree::flatten_into(element, "", &FlowConfig, &mut config);
        match element.name.as_str() {
            "INVOKE" => {
                if let Some(service) = element.attr_non_empty("SERVICE") {
                    record = record.with_variant(service);
                }
                for map in element.find_all("MAP") {
                    let prefix = match map.attr("MODE") {
                        Some("INPUT") => "input",
                        Some("OUTPUT") => "output",
                        _ => "map",
                    };
                    read_mappings(map, prefix, &mut config);
                }
            }
            "MAP" => read_mappings(element, "map", &mut config),
            "EXIT" => {
                if let Some(signal) = element.attr_non_empty("SIGNAL") {
                    record = record.with_variant(signal);
                }
            }
            _ => {}
        }
        record.config = config;
        record.raw_content = self.ctx.raw(element);
        self.sink.push(record)
    }

    /// The child steps of `parent` in order, including TRY/CATCH/FINALLY
    /// sequences.
    fn steps(&mut self, parent: &XmlElement) -> Fragment {
        let mut result = Fragment::default();
        let mut open: Option<Vec<Exit>> = None;
        let mut last_try: Option<String> = None;

        for child in parent.elements() {
            if child.name == "COMMENT" {
                continue;
            }
            if !is_step(child) {
                self.ctx
                    .warn(child, format!("Unknown flow step <{}> was skipped", child.name));
                continue;
            }

            let form = (child.name == "SEQUENCE").then(|| child.attr("FORM")).flatten();
            if form == Some("CATCH") {
                if let Some(protected) = last_try.clone() {
                    let handler = self.steps(child);
                    if let Some(entry) = &handler.entry {
                        self.sink.link(&protected, entry, EdgeKind::Error, None);
                    }
                    open.get_or_insert_with(Vec::new).extend(handler.exits);
                    continue;
                }
            }

            let fragment = self.step(child);
            let Some(entry) = fragment.entry.clone() else {
                continue;
            };
            match open.take() {
                Some(exits) => self.sink.connect(&exits, &entry),
                None => result.entry = Some(entry.clone()),
            }
            open = Some(fragment.exits);
            last_try = (form == Some("TRY")).then_some(entry);
        }

        result.exits = open.unwrap_or_default();
        result
    }

    fn step(&mut self, element: &XmlElement) -> Fragment {
        match element.name.as_str() {
            "SEQUENCE" => self.steps(element),
            "BRANCH" => self.branch(element),
            "LOOP" => {
                let id = self.record(element, RecordRole::Step);
                let body = self.steps(element);
                match body.entry {
                    Some(entry) => {
                        self.sink.link(&id, &entry, EdgeKind::Sequence, None);
                        Fragment {
                            entry: Some(id),
                            exits: body.exits,
                        }
                    }
                    None => Fragment::single(id),
                }
            }
            "REPEAT" => {
                // The body loops back to the repeat step, which then continues.
                let id = self.record(element, RecordRole::Step);
                let body = self.steps(element);
                if let Some(entry) = &body.entry {
                    self.sink.link(&id, entry, EdgeKind::Sequence, None);
                    self.sink.connect(&body.exits, &id);
                }
                Fragment::single(id)
            }
            "EXIT" => {
                let from_flow = element.attr("FROM").is_some_and(|f| f.trim() == "$flow");
                let failure = element
                    .attr("SIGNAL")
                    .is_some_and(|s| s.eq_ignore_ascii_case("FAILURE"));
                if from_flow || failure {
                    Fragment::terminal(self.record(element, RecordRole::End))
                } else {
                    Fragment::single(self.record(element, RecordRole::Step))
                }
            }
            _ => Fragment::single(self.record(element, RecordRole::Step)),
        }
    }

    fn branch(&mut self, element: &XmlElement) -> Fragment {
        let id = self.record(element, RecordRole::Step);
        let mut exits: Vec<Exit> = Vec::new();
        let mut has_default = false;

        for case in element.elements().filter(|e| is_step(e)) {
            let label = case.attr_non_empty("NAME").map(str::to_string);
            if label.as_deref() == Some("$default") {
                has_default = true;
            }
            let body = self.step(case);
            match body.entry {
                Some(entry) => {
                    self.sink.link(&id, &entry, EdgeKind::Sequence, label);
                    exits.extend(body.exits);
                }
                None => exits.push((id.clone(), label)),
            }
        }
        if !has_default {
            exits.push((id.clone(), None));
        }

        Fragment {
            entry: Some(id),
            exits,
        }
    }
}

fn comment(element: &XmlElement) -> Option<String> {
    element
        .find("COMMENT")
        .map(|c| c.text())
        .filter(|c| !c.is_empty())
}

/// Reads `MAPCOPY`, `MAPSET` and `MAPDELETE` children into `<prefix>.` keys.
fn read_mappings(map: &XmlElement, prefix: &str, config: &mut ConfigMap) {
    for entry in map.elements() {
        match entry.name.as_str() {
            "MAPCOPY" => {
                let (Some(from), Some(to)) = (entry.attr("FROM"), entry.attr("TO")) else {
                    continue;
                };
                if let (Some(from), Some(to)) = (pipeline_path(from), pipeline_path(to)) {
                    config.insert(
                        format!("{}.{}", prefix, to.replace('/', ".")),
                        ConfigValue::reference(from),
                    );
                }
            }
            "MAPSET" => {
                let Some(field) = entry.attr("FIELD").and_then(pipeline_path) else {
                    continue;
                };
                let value = entry
                    .descendant("value")
                    .map(|v| v.text())
                    .unwrap_or_default();
                config.insert(
                    format!("{}.{}", prefix, field.replace('/', ".")),
                    ConfigValue::literal(value),
                );
            }
            "MAPDELETE" => {
                if let Some(field) = entry.attr("FIELD").and_then(pipeline_path) {
                    config.insert(
                        format!("{}.drop.{}", prefix, field.replace('/', ".")),
                        ConfigValue::literal("true"),
                    );
                }
            }
            _ => {}
        }
    }
}
