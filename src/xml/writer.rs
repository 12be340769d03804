use super::{XmlElement, XmlNode};
use crate::error::XmlError;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

impl XmlElement {
    /// Serializes the tree with an XML declaration and two-space indentation.
    ///
    /// Output depends only on the tree, so equal trees give identical bytes.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| write_error(&self.name, e))?;
        write_element(&mut writer, self)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| XmlError::Encoding(e.to_string()))
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| write_error(&element.name, e));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| write_error(&element.name, e))?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| write_error(&element.name, e))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| write_error(&element.name, e))
}

fn write_error(element: &str, error: impl std::fmt::Display) -> XmlError {
    XmlError::Write {
        element: element.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    #[test]
    fn test_written_tree_reads_back_equal() {
        let tree = XmlElement::new("a:root")
            .with_attr("id", "r & 1")
            .with_child(XmlElement::text_element("a:key", "x < y"))
            .with_child(XmlElement::new("a:empty"));
        let text = tree.to_xml_string().unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let (parsed, diagnostics) = parse_document(&text, "roundtrip.xml");
        assert!(diagnostics.is_empty());
        let parsed = parsed.unwrap();
        assert_eq!(parsed.attr("id"), Some("r & 1"));
        assert_eq!(parsed.find("key").unwrap().text(), "x < y");
    }
}
