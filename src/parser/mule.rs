use super::chain::{Exit, Fragment, RecordSink};
use super::config_tree::{self, ConfigDialect};
use super::{ParseContext, SourceParser, dotted_path};
use crate::model::EdgeKind;
use crate::record::{ComponentRecord, ConfigMap, ConfigValue, DialectId, RecordRole};
use crate::xml::XmlElement;
use ahash::AHashMap;

/// Parser for Mule application documents (`<mule>` roots).
///
/// Each `flow` and `sub-flow` becomes a chain of records with ids
/// `<flow name>/<n>`. A flow's message source is its start, and a synthetic
/// `end` record closes every flow that has one.
pub struct MuleParser;

/// Elements that structure a flow rather than process messages.
const STRUCTURAL: &[&str] = &["error-handler", "description"];

/// Elements whose children are processors, not configuration.
const CONTAINERS: &[&str] = &[
    "choice",
    "scatter-gather",
    "foreach",
    "parallel-foreach",
    "until-successful",
    "try",
    "when",
    "otherwise",
    "route",
    "async",
];

struct MuleConfig;

impl ConfigDialect for MuleConfig {
    /// `#[a.b.c]` becomes `Reference("a/b/c")`; anything else stays literal.
    fn value(&self, raw: &str) -> ConfigValue {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix("#[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            if let Some(path) = dotted_path(inner) {
                return ConfigValue::reference(path);
            }
        }
        ConfigValue::literal(raw)
    }

    fn keep_attribute(&self, name: &str) -> bool {
        !name.starts_with("doc:")
    }

    fn descend(&self, element: &XmlElement) -> bool {
        element.prefix() != Some("doc")
    }
}

/// Walk state for one flow.
struct FlowWalker<'a, 'c, 'd> {
    flow: String,
    counter: usize,
    sink: &'a mut RecordSink,
    globals: &'a AHashMap<String, ConfigMap>,
    ctx: &'a mut ParseContext<'c>,
    document: &'d str,
}

impl SourceParser for MuleParser {
    fn dialect(&self) -> DialectId {
        DialectId::Mule
    }

    fn parse_tree(&self, root: &XmlElement, ctx: &mut ParseContext<'_>) -> Vec<ComponentRecord> {
        if root.local_name() != "mule" {
            ctx.warn(
                root,
                format!("Expected a <mule> root element, found <{}>", root.name),
            );
            return Vec::new();
        }

        let globals = global_configs(root);
        let document = ctx.document().to_string();
        let mut sink = RecordSink::new();

        for flow in root.elements() {
            match flow.local_name() {
                "flow" | "sub-flow" => {}
                _ => continue,
            }
            let Some(name) = flow.attr_non_empty("name") else {
                ctx.warn(flow, format!("<{}> without a name was skipped", flow.name));
                continue;
            };
            if sink.contains(&format!("{}/0", name)) {
                ctx.warn(flow, format!("Duplicate flow name '{}' was skipped", name));
                continue;
            }
            let mut walker = FlowWalker {
                flow: name.to_string(),
                counter: 0,
                sink: &mut sink,
                globals: &globals,
                ctx: &mut *ctx,
                document: &document,
            };
            walker.walk_flow(flow);
        }

        sink.into_records()
    }
}

/// Flattened attributes of every named global element, such as connector configs.
fn global_configs(root: &XmlElement) -> AHashMap<String, ConfigMap> {
    root.elements()
        .filter(|e| !matches!(e.local_name(), "flow" | "sub-flow"))
        .filter_map(|e| {
            let name = e.attr_non_empty("name")?;
            Some((name.to_string(), config_tree::flatten(e, &MuleConfig)))
        })
        .collect()
}

fn is_source(element: &XmlElement) -> bool {
    let local = element.local_name();
    matches!(local, "listener" | "scheduler" | "poll")
        || local.ends_with("-listener")
        || local.starts_with("on-new")
        || local.contains("new-or-updated")
}

fn is_processor(element: &XmlElement) -> bool {
    element.prefix() != Some("doc") && !STRUCTURAL.contains(&element.local_name())
}

impl FlowWalker<'_, '_, '_> {
    fn next_id(&mut self) -> String {
        let id = format!("{}/{}", self.flow, self.counter);
        self.counter += 1;
        id
    }

    fn record(&mut self, element: &XmlElement, role: RecordRole) -> String {
        let id = self.next_id();
        let name = element
            .attr_non_empty("doc:name")
            .unwrap_or(element.local_name())
            .to_string();
        let mut record = ComponentRecord::new(
            id,
            name,
            element.name.clone(),
            self.document,
            DialectId::Mule,
        )
        .with_role(role);
        if let Some(doc_id) = element.attr_non_empty("doc:id") {
            record = record.with_merge_key(doc_id);
        }

        let mut config = ConfigMap::new();
        if !CONTAINERS.contains(&element.local_name()) {
            config_tree::flatten_into(element, "", &MuleConfig, &mut config);
        } else {
            for (key, raw) in &element.attributes {
                if MuleConfig.keep_attribute(key) && !key.starts_with("xmlns") {
                    config.insert(key.clone(), MuleConfig.value(raw));
                }
            }
        }
        if let Some(global) = element
            .attr_non_empty("config-ref")
            .and_then(|name| self.globals.get(name))
        {
            for (key, value) in global {
                config.insert(format!("config.{}", key), value.clone());
            }
        }
        record.config = config;
        record.raw_content = self.ctx.raw(element);
        self.sink.push(record)
    }

    fn synthetic(&mut self, id: String, name: &str, source_type: &str, role: RecordRole) -> String {
        let record = ComponentRecord::new(id, name, source_type, self.document, DialectId::Mule)
            .with_role(role);
        self.sink.push(record)
    }

    fn walk_flow(&mut self, flow: &XmlElement) {
        let mut processors: Vec<&XmlElement> = flow.elements().filter(|e| is_processor(e)).collect();

        let start = if processors.first().is_some_and(|e| is_source(e)) {
            let first = processors.remove(0);
            Some(self.record(first, RecordRole::Start))
        } else {
            None
        };

        let body = self.chain(&processors);
        let mut fragments = Vec::new();
        if let Some(start) = &start {
            fragments.push(Fragment::single(start.clone()));
        }
        fragments.push(body);
        let chained = self.sink.sequence(fragments);

        let end = start.as_ref().map(|_| {
            let id = format!("{}/end", self.flow);
            self.synthetic(id, "End", "end", RecordRole::End)
        });
        if let Some(end) = &end {
            self.sink.connect(&chained.exits, end);
        }

        if let (Some(entry), Some(handler)) = (chained.entry.as_deref(), flow.find("error-handler")) {
            let exits = self.error_handler(entry, handler);
            if let Some(end) = &end {
                self.sink.connect(&exits, end);
            }
        }
    }

    /// Processors in order, wired into one fragment.
    fn chain(&mut self, elements: &[&XmlElement]) -> Fragment {
        let fragments: Vec<Fragment> = elements
            .iter()
            .filter(|e| is_processor(e))
            .map(|e| self.processor(e))
            .collect();
        self.sink.sequence(fragments)
    }

    fn children_chain(&mut self, element: &XmlElement) -> Fragment {
        let children: Vec<&XmlElement> = element.elements().collect();
        self.chain(&children)
    }

    fn processor(&mut self, element: &XmlElement) -> Fragment {
        match element.local_name() {
            "choice" => self.choice(element),
            "scatter-gather" => self.scatter_gather(element),
            "foreach" | "parallel-foreach" | "until-successful" => {
                let id = self.record(element, RecordRole::Step);
                let body = self.children_chain(element);
                self.enter(&id, body)
            }
            "try" => self.try_scope(element),
            "flow-ref" => {
                let id = self.record(element, RecordRole::Step);
                if let Some(target) = element
                    .attr_non_empty("name")
                    .filter(|name| !name.starts_with("#["))
                {
                    self.sink
                        .link(&id, &format!("{}/0", target), EdgeKind::Reference, None);
                }
                Fragment::single(id)
            }
            "raise-error" => Fragment::terminal(self.record(element, RecordRole::End)),
            _ => Fragment::single(self.record(element, RecordRole::Step)),
        }
    }

    /// Links `id` into `body`; control leaves through the body, or through
    /// `id` itself when the body is empty.
    fn enter(&mut self, id: &str, body: Fragment) -> Fragment {
        match body.entry {
            Some(entry) => {
                self.sink.link(id, &entry, EdgeKind::Sequence, None);
                Fragment {
                    entry: Some(id.to_string()),
                    exits: body.exits,
                }
            }
            None => Fragment::single(id.to_string()),
        }
    }

    fn choice(&mut self, element: &XmlElement) -> Fragment {
        let id = self.record(element, RecordRole::Step);
        let mut exits: Vec<Exit> = Vec::new();
        let mut has_otherwise = false;

        for branch in element.elements() {
            let condition = match branch.local_name() {
                "when" => Some(branch.attr("expression").unwrap_or_default().trim().to_string()),
                "otherwise" => {
                    has_otherwise = true;
                    None
                }
                _ => {
                    self.ctx
                        .warn(branch, format!("Unexpected <{}> inside <choice>", branch.name));
                    continue;
                }
            };
            let body = self.children_chain(branch);
            match body.entry {
                Some(entry) => {
                    self.sink.link(&id, &entry, EdgeKind::Sequence, condition);
                    exits.extend(body.exits);
                }
                None => exits.push((id.clone(), condition)),
            }
        }
        if !has_otherwise {
            exits.push((id.clone(), None));
        }

        Fragment {
            entry: Some(id),
            exits,
        }
    }

    fn scatter_gather(&mut self, element: &XmlElement) -> Fragment {
        let id = self.record(element, RecordRole::Step);
        let mut route_exits: Vec<Exit> = Vec::new();
        for route in element.find_all("route") {
            let body = self.children_chain(route);
            match body.entry {
                Some(entry) => {
                    self.sink.link(&id, &entry, EdgeKind::Sequence, None);
                    route_exits.extend(body.exits);
                }
                None => route_exits.push((id.clone(), None)),
            }
        }

        if route_exits.is_empty() {
            route_exits.push((id.clone(), None));
        }

        let name = format!(
            "{} (aggregate)",
            element.attr_non_empty("doc:name").unwrap_or("scatter-gather")
        );
        let aggregate_id = self.next_id();
        let aggregate = ComponentRecord::new(
            aggregate_id,
            name,
            element.name.clone(),
            self.document,
            DialectId::Mule,
        )
        .with_variant("aggregate");
        let aggregate = self.sink.push(aggregate);
        self.sink.connect(&route_exits, &aggregate);

        Fragment {
            entry: Some(id),
            exits: vec![(aggregate, None)],
        }
    }

    /// `try` is inlined: its processors run in place and its handlers hang off
    /// the first of them through error links.
    fn try_scope(&mut self, element: &XmlElement) -> Fragment {
        let body = self.children_chain(element);
        let Some(entry) = body.entry.clone() else {
            return body;
        };
        let mut exits = body.exits;
        if let Some(handler) = element.find("error-handler") {
            exits.extend(self.error_handler(&entry, handler));
        }
        Fragment {
            entry: Some(entry),
            exits,
        }
    }

    /// Wires each `on-error-*` handler to `protected` with an error link.
    /// Returns the exits of continuing handlers; propagating handlers end in a
    /// synthetic error end.
    fn error_handler(&mut self, protected: &str, handler: &XmlElement) -> Vec<Exit> {
        let mut exits = Vec::new();
        for (index, strategy) in handler.elements().enumerate() {
            let propagate = match strategy.local_name() {
                "on-error-propagate" => true,
                "on-error-continue" => false,
                _ => {
                    self.ctx.warn(
                        strategy,
                        format!("Unsupported error strategy <{}>", strategy.name),
                    );
                    continue;
                }
            };
            let condition = strategy.attr_non_empty("type").map(str::to_string);
            let body = self.children_chain(strategy);

            let mut fragments = vec![body];
            if propagate {
                let id = format!("{}/error-end-{}", self.flow, index);
                let end = self.synthetic(id, "Error End", "on-error-propagate", RecordRole::End);
                fragments.push(Fragment::terminal(end));
            }
            let handled = self.sink.sequence(fragments);
            if let Some(entry) = &handled.entry {
                self.sink.link(protected, entry, EdgeKind::Error, condition);
            }
            exits.extend(handled.exits);
        }
        exits
    }
}
