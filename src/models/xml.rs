//! XML rendering for listing responses.
//!
//! Output follows the S3 RestXml conventions: an XML declaration, a root
//! element carrying the S3 namespace, lowercase booleans, and escaped text.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use std::io::{self, Write};
use thiserror::Error;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// quick-xml's writer reports failures as plain `io::Error`.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A value that renders itself as XML child elements.
///
/// The root element is written by [`to_xml`]; implementors only write what
/// goes inside it.
pub trait ToXml {
    /// Name of the document root element.
    const ROOT: &'static str;

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Render a complete XML document for `value`.
pub fn to_xml<T: ToXml>(value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(T::ROOT)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.write_xml(w))?;

    Ok(buf)
}

/// Write a simple `<tag>text</tag>` element.
pub fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

pub fn write_bool_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: bool,
) -> io::Result<()> {
    write_text_element(writer, tag, if value { "true" } else { "false" })
}
