//! Normalization of source configuration into template properties.

use super::TargetType;
use crate::model::CanonicalNode;
use crate::record::{ConfigMap, ConfigValue};

/// A canonical property key and the source keys it may be read from, best first.
struct Alias {
    key: &'static str,
    sources: &'static [&'static str],
}

const fn alias(key: &'static str, sources: &'static [&'static str]) -> Alias {
    Alias { key, sources }
}

const ADDRESS: Alias = alias(
    "address",
    &["url", "address", "endpoint", "uri", "path", "host", "queue", "destination"],
);
const HTTP_METHOD: Alias = alias("httpMethod", &["method", "httpmethod", "verb", "actiontype"]);

const REQUEST_REPLY: &[Alias] = &[ADDRESS, HTTP_METHOD];
const SEND: &[Alias] = &[ADDRESS];
const SCRIPT: &[Alias] = &[alias("script", &["script", "code", "text", "scriptfile"])];
const MESSAGE_MAPPING: &[Alias] = &[alias(
    "mappingPath",
    &["resource", "mappingfile", "mapping", "mapid", "map"],
)];
const CONVERTER: &[Alias] = &[alias("format", &["format", "mimetype", "outputtype"])];
const CONTENT_MODIFIER: &[Alias] = &[
    alias("name", &["variablename", "propertyname", "name", "field"]),
    alias("value", &["value", "payload", "body"]),
];
const LOGGER: &[Alias] = &[
    alias("message", &["message", "logmessage", "text"]),
    alias("level", &["level", "loglevel", "severity"]),
];
const DATA_STORE: &[Alias] = &[alias("query", &["sql", "query", "statement", "key"])];
const PROCESS_CALL: &[Alias] = &[alias(
    "processId",
    &["flowname", "processid", "subprocess", "service", "name"],
)];
const LOOPING_PROCESS_CALL: &[Alias] = &[
    alias("processId", &["flowname", "processid", "service"]),
    alias(
        "maxNumberOfIterations",
        &["maxretries", "maxiterations", "count", "maxcount"],
    ),
];
const SPLITTER: &[Alias] = &[alias(
    "expression",
    &["collection", "inarray", "expression", "splitexpression"],
)];
const FILTER: &[Alias] = &[alias("xpath", &["expression", "filter", "condition", "schema"])];
const ENCODER: &[Alias] = &[alias("encoding", &["encoding", "algorithm", "format"])];
const GATHER: &[Alias] = &[alias("strategy", &["strategy", "aggregation"])];

fn aliases(target: TargetType) -> &'static [Alias] {
    match target {
        TargetType::RequestReply => REQUEST_REPLY,
        TargetType::Send => SEND,
        TargetType::Script => SCRIPT,
        TargetType::MessageMapping => MESSAGE_MAPPING,
        TargetType::Converter => CONVERTER,
        TargetType::ContentModifier => CONTENT_MODIFIER,
        TargetType::Logger => LOGGER,
        TargetType::DataStore => DATA_STORE,
        TargetType::ProcessCall => PROCESS_CALL,
        TargetType::LoopingProcessCall => LOOPING_PROCESS_CALL,
        TargetType::Splitter => SPLITTER,
        TargetType::Filter => FILTER,
        TargetType::Encoder => ENCODER,
        TargetType::Gather => GATHER,
        _ => &[],
    }
}

/// Lowercased with punctuation removed, so `IN-ARRAY`, `in_array` and
/// `inArray` compare equal.
fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The last dotted segment of a flattened key, without a repeat index.
fn leaf(key: &str) -> &str {
    let last = key.rsplit('.').next().unwrap_or(key);
    last.split('[').next().unwrap_or(last)
}

/// Finds the first source key, in alias priority order, whose leaf matches.
/// Top-level keys are preferred over nested ones.
fn resolve<'a>(config: &'a ConfigMap, sources: &[&str]) -> Option<&'a ConfigValue> {
    for source in sources {
        let mut nested = None;
        for (key, value) in config {
            if value.is_empty() || fold_key(leaf(key)) != *source {
                continue;
            }
            if !key.contains('.') {
                return Some(value);
            }
            nested = nested.or(Some(value));
        }
        if nested.is_some() {
            return nested;
        }
    }
    None
}

/// Builds the property map for a classified node: canonical keys first, then
/// `sourceType` (and `sourceVariant`), then every config entry.
pub fn normalize(node: &CanonicalNode, target: TargetType) -> ConfigMap {
    let mut properties = ConfigMap::new();
    for alias in aliases(target) {
        if let Some(value) = resolve(&node.config, alias.sources) {
            properties.insert(alias.key.to_string(), value.clone());
        }
    }
    properties.insert(
        "sourceType".to_string(),
        ConfigValue::literal(node.source_type.clone()),
    );
    if let Some(variant) = &node.variant {
        properties.insert(
            "sourceVariant".to_string(),
            ConfigValue::literal(variant.clone()),
        );
    }
    for (key, value) in &node.config {
        properties
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, ConfigValue)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fold_key_ignores_case_and_punctuation() {
        assert_eq!(fold_key("IN-ARRAY"), "inarray");
        assert_eq!(fold_key("in_array"), "inarray");
        assert_eq!(fold_key("inArray"), "inarray");
    }

    #[test]
    fn test_resolve_prefers_alias_order_then_top_level() {
        let cfg = config(&[
            ("config.connection.host", ConfigValue::literal("example.org")),
            ("path", ConfigValue::literal("/orders")),
        ]);
        let value = resolve(&cfg, &["url", "path", "host"]).unwrap();
        assert_eq!(value.as_str(), "/orders");

        let cfg = config(&[
            ("config.host", ConfigValue::literal("nested")),
            ("host", ConfigValue::literal("top")),
        ]);
        assert_eq!(resolve(&cfg, &["host"]).unwrap().as_str(), "top");
    }

    #[test]
    fn test_resolve_skips_empty_values() {
        let cfg = config(&[
            ("url", ConfigValue::literal("")),
            ("path", ConfigValue::reference("vars/target")),
        ]);
        assert_eq!(
            resolve(&cfg, &["url", "path"]),
            Some(&ConfigValue::reference("vars/target"))
        );
    }
}
