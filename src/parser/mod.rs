//! Source dialect parsers.
//!
//! Every parser reads one document into [`ComponentRecord`]s. Parsing never
//! fails: malformed fragments become `ParseError` diagnostics with a location
//! and the rest of the document is still read.

use crate::record::{ComponentRecord, DialectId};
use crate::report::{Diagnostic, Severity};
use crate::xml::{self, XmlElement};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

mod boomi;
pub(crate) mod chain;
pub(crate) mod config_tree;
mod mule;
mod webmethods;

pub use boomi::BoomiParser;
pub use mule::MuleParser;
pub use webmethods::WebMethodsParser;

/// Limits applied before a document is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Documents above this size are rejected with a diagnostic.
    pub max_document_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_document_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Records and diagnostics read from one document.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub records: Vec<ComponentRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// State shared with a parser while it walks one document.
pub struct ParseContext<'a> {
    document: &'a str,
    text: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ParseContext<'a> {
    pub fn new(document: &'a str, text: &'a str) -> Self {
        Self {
            document,
            text,
            diagnostics: Vec::new(),
        }
    }

    pub fn document(&self) -> &'a str {
        self.document
    }

    /// The source text an element was read from.
    pub fn raw(&self, element: &XmlElement) -> String {
        element
            .span
            .and_then(|(start, end)| self.text.get(start..end))
            .unwrap_or_default()
            .to_string()
    }

    /// `document:line:column` of an element's start tag.
    pub fn location(&self, element: &XmlElement) -> String {
        let offset = element.span.map_or(0, |(start, _)| start);
        xml::location(self.document, self.text, offset)
    }

    /// Records a recoverable problem with `element`.
    pub fn warn(&mut self, element: &XmlElement, message: impl Into<String>) {
        let message = message.into();
        warn!(document = self.document, %message, "skipping source fragment");
        let diagnostic = Diagnostic::parse_error(Severity::Warning, message)
            .with_location(self.location(element));
        self.diagnostics.push(diagnostic);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Contract for a dialect parser.
pub trait SourceParser: Send + Sync {
    fn dialect(&self) -> DialectId;

    /// Extracts records from a document's root element.
    fn parse_tree(&self, root: &XmlElement, ctx: &mut ParseContext<'_>) -> Vec<ComponentRecord>;
}

/// Dialect parsers keyed by [`DialectId`].
pub struct ParserRegistry {
    parsers: AHashMap<DialectId, Box<dyn SourceParser>>,
    options: ParseOptions,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// A registry with the built-in Mule, Boomi and webMethods parsers.
    pub fn new() -> Self {
        let mut parsers: AHashMap<DialectId, Box<dyn SourceParser>> = AHashMap::new();
        register_default_parsers(&mut parsers);
        Self {
            parsers,
            options: ParseOptions::default(),
        }
    }

    /// A registry with no parsers at all.
    pub fn empty() -> Self {
        Self {
            parsers: AHashMap::new(),
            options: ParseOptions::default(),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn SourceParser>) -> Self {
        self.parsers.insert(parser.dialect(), parser);
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn supports(&self, dialect: DialectId) -> bool {
        self.parsers.contains_key(&dialect)
    }

    /// Parses one document. Never fails; problems are reported as diagnostics.
    pub fn parse(&self, bytes: &[u8], dialect: DialectId, document: &str) -> ParseOutput {
        let Some(parser) = self.parsers.get(&dialect) else {
            return rejected(
                Severity::Fatal,
                format!("No parser registered for dialect '{}'", dialect),
                document,
            );
        };

        if bytes.len() > self.options.max_document_bytes {
            return rejected(
                Severity::Warning,
                format!(
                    "Document is {} bytes, above the limit of {} bytes",
                    bytes.len(),
                    self.options.max_document_bytes
                ),
                document,
            );
        }

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                let (line, column) = xml::line_col(
                    &String::from_utf8_lossy(&bytes[..e.valid_up_to()]),
                    e.valid_up_to(),
                );
                let mut output = rejected(
                    Severity::Warning,
                    format!("Document is not valid UTF-8: {}", e),
                    document,
                );
                for diagnostic in &mut output.diagnostics {
                    diagnostic.location = Some(format!("{}:{}:{}", document, line, column));
                }
                return output;
            }
        };

        let (root, mut diagnostics) = xml::parse_document(text, document);
        let mut records = Vec::new();
        if let Some(root) = root {
            let mut ctx = ParseContext::new(document, text);
            records = parser.parse_tree(&root, &mut ctx);
            diagnostics.extend(ctx.into_diagnostics());
        }

        for record in &records {
            debug!(id = %record.id, source_type = %record.source_type, links = record.links.len(), "parsed record");
        }
        info!(
            document,
            dialect = %dialect,
            records = records.len(),
            diagnostics = diagnostics.len(),
            "document parsed"
        );
        ParseOutput {
            records,
            diagnostics,
        }
    }
}

fn register_default_parsers(parsers: &mut AHashMap<DialectId, Box<dyn SourceParser>>) {
    parsers.insert(DialectId::Mule, Box::new(MuleParser));
    parsers.insert(DialectId::Boomi, Box::new(BoomiParser));
    parsers.insert(DialectId::WebMethods, Box::new(WebMethodsParser));
}

fn rejected(severity: Severity, message: String, document: &str) -> ParseOutput {
    warn!(document, %message, "document rejected");
    ParseOutput {
        records: Vec::new(),
        diagnostics: vec![
            Diagnostic::parse_error(severity, message).with_location(format!("{}:1:1", document)),
        ],
    }
}

/// Parses `bytes` with the built-in parsers and default limits.
pub fn parse(bytes: &[u8], dialect: DialectId, document: &str) -> ParseOutput {
    ParserRegistry::new().parse(bytes, dialect, document)
}

/// Converts a dotted path such as `vars.order.id` to `vars/order/id` when it
/// is a plain identifier path; `None` for anything more complex.
pub(crate) fn dotted_path(expression: &str) -> Option<String> {
    let expression = expression.trim();
    if expression.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for segment in expression.split('.') {
        let mut chars = segment.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return None;
        }
        segments.push(segment);
    }
    Some(segments.join("/"))
}
