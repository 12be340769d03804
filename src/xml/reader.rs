use super::{XmlElement, XmlNode};
use crate::report::{Diagnostic, Severity};
use quick_xml::Reader;
use quick_xml::errors::Error;
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// Reads `text` into an element tree.
///
/// Never fails. End tags are matched here rather than by the reader: a
/// stray end tag is skipped, and one that names an outer element closes
/// everything opened since. Other ill-formed markup is reported and skipped;
/// a syntax error stops reading and closes whatever elements were still
/// open. Every problem becomes a `ParseError` diagnostic, and elements read
/// so far are returned so callers can salvage them.
pub fn parse_document(text: &str, document: &str) -> (Option<XmlElement>, Vec<Diagnostic>) {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut diagnostics = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(tag)) => {
                let start = tag_start(text, start);
                let mut element = element_from(&tag, text, start, document, &mut diagnostics);
                element.span = Some((start, start));
                stack.push(element);
            }
            Ok(Event::Empty(tag)) => {
                let start = tag_start(text, start);
                let mut element = element_from(&tag, text, start, document, &mut diagnostics);
                element.span = Some((start, reader.buffer_position() as usize));
                attach(element, &mut stack, &mut root, text, document, &mut diagnostics);
            }
            Ok(Event::End(tag)) => {
                let end = reader.buffer_position() as usize;
                let at = tag_start(text, start);
                match matching_open(&stack, &tag) {
                    Some(depth) => {
                        for _ in depth + 1..stack.len() {
                            let name = stack.last().map(|e| e.name.clone()).unwrap_or_default();
                            diagnostics.push(
                                Diagnostic::parse_error(
                                    Severity::Warning,
                                    format!("Malformed XML, <{}> closed implicitly", name),
                                )
                                .with_location(location(document, text, at)),
                            );
                            close_current(at, &mut stack, &mut root, text, document, &mut diagnostics);
                        }
                        close_current(end, &mut stack, &mut root, text, document, &mut diagnostics);
                    }
                    None => diagnostics.push(
                        Diagnostic::parse_error(
                            Severity::Warning,
                            format!(
                                "Malformed XML, skipped stray </{}>",
                                String::from_utf8_lossy(tag.name().as_ref())
                            ),
                        )
                        .with_location(location(document, text, at)),
                    ),
                }
            }
            Ok(Event::Text(content)) => match content.unescape() {
                Ok(value) => push_text(&mut stack, value.into_owned()),
                Err(e) => diagnostics.push(
                    Diagnostic::parse_error(Severity::Warning, format!("Unreadable text: {}", e))
                        .with_location(location(document, text, start)),
                ),
            },
            Ok(Event::CData(content)) => {
                let value = String::from_utf8_lossy(&content.into_inner()).into_owned();
                push_text(&mut stack, value);
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    diagnostics.push(
                        Diagnostic::parse_error(
                            Severity::Warning,
                            format!("{} element(s) were never closed", stack.len()),
                        )
                        .with_location(location(document, text, text.len())),
                    );
                }
                break;
            }
            Ok(_) => {}
            // Only resume when the reader moved past the bad markup.
            Err(Error::IllFormed(e)) if (reader.buffer_position() as usize) > start => {
                let position = reader.error_position() as usize;
                diagnostics.push(
                    Diagnostic::parse_error(Severity::Warning, format!("Malformed XML, skipped: {}", e))
                        .with_location(location(document, text, position)),
                );
            }
            Err(e) => {
                let position = reader.error_position() as usize;
                diagnostics.push(
                    Diagnostic::parse_error(
                        Severity::Warning,
                        format!("Malformed XML, reading stopped: {}", e),
                    )
                    .with_location(location(document, text, position)),
                );
                break;
            }
        }
    }

    // Close anything left open so the partial tree is still usable.
    while let Some(mut element) = stack.pop() {
        if let Some((open, _)) = element.span {
            element.span = Some((open, text.len()));
        }
        attach(element, &mut stack, &mut root, text, document, &mut diagnostics);
    }

    if root.is_none() && diagnostics.is_empty() {
        diagnostics.push(Diagnostic::parse_error(
            Severity::Warning,
            format!("Document '{}' contains no root element", document),
        ));
    }

    (root, diagnostics)
}

/// Offset of the `<` opening the tag read from `offset`; trimmed whitespace
/// before it is not part of the element.
fn tag_start(text: &str, offset: usize) -> usize {
    text.get(offset..)
        .and_then(|rest| rest.find('<'))
        .map_or(offset, |i| offset + i)
}

/// 1-based line and column of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit_once('\n')
        .map_or(before, |(_, tail)| tail)
        .chars()
        .count()
        + 1;
    (line, column)
}

pub(crate) fn location(document: &str, text: &str, offset: usize) -> String {
    let (line, column) = line_col(text, offset);
    format!("{}:{}:{}", document, line, column)
}

fn element_from(
    tag: &BytesStart<'_>,
    text: &str,
    offset: usize,
    document: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> XmlElement {
    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attribute in tag.attributes() {
        let attribute = match attribute {
            Ok(a) => a,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::parse_error(
                        Severity::Warning,
                        format!("Skipped malformed attribute on <{}>: {}", element.name, e),
                    )
                    .with_location(location(document, text, offset)),
                );
                continue;
            }
        };
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        match attribute.unescape_value() {
            Ok(value) => element.attributes.push((key, value.into_owned())),
            Err(e) => diagnostics.push(
                Diagnostic::parse_error(
                    Severity::Warning,
                    format!("Skipped attribute '{}' on <{}>: {}", key, element.name, e),
                )
                .with_location(location(document, text, offset)),
            ),
        }
    }
    element
}

/// Stack index of the innermost open element named by `tag`.
fn matching_open(stack: &[XmlElement], tag: &BytesEnd<'_>) -> Option<usize> {
    let name = tag.name();
    stack
        .iter()
        .rposition(|element| element.name.as_bytes() == name.as_ref())
}

fn close_current(
    end: usize,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    text: &str,
    document: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(mut element) = stack.pop() {
        if let Some((open, _)) = element.span {
            element.span = Some((open, end));
        }
        attach(element, stack, root, text, document, diagnostics);
    }
}

fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    text: &str,
    document: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    } else {
        let offset = element.span.map_or(0, |(open, _)| open);
        diagnostics.push(
            Diagnostic::parse_error(
                Severity::Warning,
                format!("Ignored extra root element <{}>", element.name),
            )
            .with_location(location(document, text, offset)),
        );
    }
}

fn push_text(stack: &mut [XmlElement], value: String) {
    if value.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_counts_from_one() {
        let text = "<a>\n  <b/>\n</a>";
        assert_eq!(line_col(text, 0), (1, 1));
        assert_eq!(line_col(text, 6), (2, 3));
    }

    #[test]
    fn test_spans_cover_the_element() {
        let text = "<root><child id=\"1\">x</child></root>";
        let (root, diagnostics) = parse_document(text, "t.xml");
        assert!(diagnostics.is_empty());
        let root = root.unwrap();
        let child = root.find("child").unwrap();
        let (start, end) = child.span.unwrap();
        assert_eq!(&text[start..end], "<child id=\"1\">x</child>");
    }

    #[test]
    fn test_truncated_document_keeps_completed_elements() {
        let text = "<root><ok/><broken attr=\"1\"></root>";
        let (root, diagnostics) = parse_document(text, "t.xml");
        assert!(!diagnostics.is_empty());
        let root = root.unwrap();
        assert!(root.find("ok").is_some());
    }

    #[test]
    fn test_stray_end_tag_is_skipped() {
        let text = "<root><a/></x><b/></root>";
        let (root, diagnostics) = parse_document(text, "t.xml");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("stray </x>"));
        let root = root.unwrap();
        assert!(root.find("a").is_some());
        assert!(root.find("b").is_some());
    }

    #[test]
    fn test_outer_end_tag_closes_inner_elements() {
        let text = "<root><a><b></a><c/></root>";
        let (root, diagnostics) = parse_document(text, "t.xml");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("<b> closed implicitly"));
        let root = root.unwrap();
        let a = root.find("a").unwrap();
        assert!(a.find("b").is_some());
        assert!(a.find("c").is_none());
        assert!(root.find("c").is_some());
        let (start, end) = a.span.unwrap();
        assert_eq!(&text[start..end], "<a><b></a>");
    }
}
