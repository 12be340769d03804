//! Keyword rules used when the mapping table has no entry for a type.
//!
//! Rules are pure predicates over a token list and are tried in priority order.

use super::TargetType;

/// One keyword rule: any token matching any keyword selects `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub target: TargetType,
}

impl HeuristicRule {
    pub const fn new(
        name: &'static str,
        keywords: &'static [&'static str],
        target: TargetType,
    ) -> Self {
        Self {
            name,
            keywords,
            target,
        }
    }

    /// A keyword matches a token when they are equal, or, for keywords of five
    /// or more characters, when the token contains the keyword.
    pub fn matches(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|token| {
            self.keywords
                .iter()
                .any(|kw| token == kw || (kw.len() >= 5 && token.contains(kw)))
        })
    }
}

/// The built-in rule list, highest priority first.
pub fn default_rules() -> Vec<HeuristicRule> {
    vec![
        HeuristicRule::new(
            "logging",
            &["log", "logger", "logging", "debuglog", "audit", "trace"],
            TargetType::Logger,
        ),
        HeuristicRule::new(
            "scripting",
            &["script", "groovy", "javascript", "js", "python", "eval"],
            TargetType::Script,
        ),
        HeuristicRule::new(
            "mapping",
            &["transform", "map", "mapping", "mapper", "dataweave", "xslt"],
            TargetType::MessageMapping,
        ),
        HeuristicRule::new(
            "encoding",
            &[
                "encode", "decode", "base64", "encrypt", "decrypt", "sign", "gzip", "zip",
                "compress",
            ],
            TargetType::Encoder,
        ),
        HeuristicRule::new(
            "conversion",
            &["convert", "converter", "csv", "serialize", "deserialize", "tojson", "toxml"],
            TargetType::Converter,
        ),
        HeuristicRule::new(
            "routing",
            &["choice", "decision", "branch", "route", "router", "switch", "when"],
            TargetType::Router,
        ),
        HeuristicRule::new(
            "splitting",
            &["split", "splitter", "foreach", "iterate", "each"],
            TargetType::Splitter,
        ),
        HeuristicRule::new(
            "gathering",
            &["gather", "aggregate", "aggregator", "collect", "combine"],
            TargetType::Gather,
        ),
        HeuristicRule::new("joining", &["join"], TargetType::Join),
        HeuristicRule::new(
            "fan-out",
            &["scatter", "multicast", "broadcast", "fork", "parallel"],
            TargetType::Multicast,
        ),
        HeuristicRule::new(
            "filtering",
            &["filter", "validate", "validation", "validator"],
            TargetType::Filter,
        ),
        HeuristicRule::new(
            "looping",
            &["loop", "repeat", "until", "retry", "while"],
            TargetType::LoopingProcessCall,
        ),
        HeuristicRule::new(
            "persistence",
            &[
                "db", "database", "sql", "jdbc", "select", "insert", "update", "delete", "store",
                "persist", "datastore",
            ],
            TargetType::DataStore,
        ),
        HeuristicRule::new(
            "request-reply",
            &[
                "http", "https", "request", "rest", "soap", "api", "client", "consume",
                "webservice", "listener",
            ],
            TargetType::RequestReply,
        ),
        HeuristicRule::new(
            "sending",
            &[
                "publish", "send", "produce", "write", "jms", "amqp", "kafka", "mq", "sftp", "ftp",
                "smtp", "email", "mail", "notify",
            ],
            TargetType::Send,
        ),
        HeuristicRule::new(
            "process-call",
            &["call", "ref", "invoke", "subprocess", "subflow", "flowref", "processcall"],
            TargetType::ProcessCall,
        ),
        HeuristicRule::new(
            "content-modification",
            &[
                "set", "enrich", "enricher", "header", "property", "properties", "variable",
                "payload", "modify", "modifier", "remove", "copy", "assign",
            ],
            TargetType::ContentModifier,
        ),
    ]
}

/// Splits text into lowercase tokens at punctuation, whitespace, digit
/// boundaries and camelCase humps.
///
/// `HttpRequest` gives `["http", "request"]`, `pub.client:http` gives
/// `["pub", "client", "http"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let hump = c.is_uppercase()
                && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower));
            if hump {
                flush(&mut current, &mut tokens);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// First rule matching `tokens`, in list order.
pub fn first_match<'a>(rules: &'a [HeuristicRule], tokens: &[String]) -> Option<&'a HeuristicRule> {
    if tokens.is_empty() {
        return None;
    }
    rules.iter().find(|rule| rule.matches(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_camel_case_and_punctuation() {
        assert_eq!(tokenize("HttpRequest"), vec!["http", "request"]);
        assert_eq!(tokenize("pub.client:http"), vec!["pub", "client", "http"]);
        assert_eq!(tokenize("set-payload"), vec!["set", "payload"]);
        assert_eq!(tokenize("XMLToJSON"), vec!["xml", "to", "json"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_rules_apply_in_priority_order() {
        let rules = default_rules();
        // "log" (logging) outranks "http" (request-reply).
        let tokens = tokenize("http-log");
        assert_eq!(first_match(&rules, &tokens).unwrap().target, TargetType::Logger);

        let tokens = tokenize("parallel-foreach");
        assert_eq!(first_match(&rules, &tokens).unwrap().target, TargetType::Splitter);
    }

    #[test]
    fn test_long_keywords_match_inside_tokens() {
        let rules = default_rules();
        let tokens = tokenize("transformmessage");
        assert_eq!(first_match(&rules, &tokens).unwrap().target, TargetType::MessageMapping);
        // Short keywords only match whole tokens.
        assert!(first_match(&rules, &tokenize("dbx")).is_none());
    }

    #[test]
    fn test_no_match_for_unrelated_tokens() {
        assert!(first_match(&default_rules(), &tokenize("Quasar Widget")).is_none());
    }
}
