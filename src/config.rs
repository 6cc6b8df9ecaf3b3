//! Layout configuration.
//!
//! A [`LayoutConfig`] can be embedded in the document JSON, loaded from a
//! standalone JSON file, or read from an XML file shaped like this:
//!
//! ```xml
//! <folio>
//!   <layout max-backtrack="8" orphans="2" widows="2"/>
//!   <leniency flow="false" block="true" inline="true" static-content="true"/>
//!   <font family="Helvetica" size="12" line-height="1.2" char-width="0.5"/>
//! </folio>
//! ```
//!
//! Unknown elements and attributes are ignored.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// How many earlier break candidates the page driver may fall back to
    /// before forcing a break.
    pub max_backtrack: usize,
    /// Default orphans for content that doesn't set its own.
    pub orphans: u32,
    /// Default widows for content that doesn't set its own.
    pub widows: u32,
    pub leniency: Leniency,
    pub font: FontDefaults,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_backtrack: 16,
            orphans: 2,
            widows: 2,
            leniency: Leniency::default(),
            font: FontDefaults::default(),
        }
    }
}

/// Per-construct policy for content its content model forbids.
///
/// Lenient constructs skip the offending child with a warning. Strict
/// constructs abandon their whole subtree with an error diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Leniency {
    pub flow: bool,
    pub block: bool,
    pub inline: bool,
    pub static_content: bool,
}

impl Default for Leniency {
    fn default() -> Self {
        Self {
            flow: false,
            block: true,
            inline: true,
            static_content: true,
        }
    }
}

/// The constructs a leniency flag can be set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Flow,
    Block,
    Inline,
    StaticContent,
}

impl Leniency {
    pub fn is_lenient(&self, construct: Construct) -> bool {
        match construct {
            Construct::Flow => self.flow,
            Construct::Block => self.block,
            Construct::Inline => self.inline,
            Construct::StaticContent => self.static_content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontDefaults {
    pub family: String,
    pub size: f64,
    pub line_height: f64,
    /// Advance of one character as a fraction of the font size, used by the
    /// fixed-pitch measurer.
    pub char_width: f64,
}

impl Default for FontDefaults {
    fn default() -> Self {
        Self {
            family: "Helvetica".to_string(),
            size: 12.0,
            line_height: 1.2,
            char_width: 0.5,
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an XML configuration. Values not present keep their defaults.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut config = LayoutConfig::default();
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => config.apply_element(&e)?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(config)
    }

    /// Load from a file, choosing the format by extension (`.json` or XML).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FolioError::Config(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_xml_str(&text),
        }
    }

    fn apply_element(&mut self, e: &BytesStart) -> Result<()> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        match tag.as_str() {
            "layout" => {
                if let Some(v) = get_attr_parsed(e, "max-backtrack")? {
                    self.max_backtrack = v;
                }
                if let Some(v) = get_attr_parsed(e, "orphans")? {
                    self.orphans = v;
                }
                if let Some(v) = get_attr_parsed(e, "widows")? {
                    self.widows = v;
                }
            }
            "leniency" => {
                if let Some(v) = get_attr_parsed(e, "flow")? {
                    self.leniency.flow = v;
                }
                if let Some(v) = get_attr_parsed(e, "block")? {
                    self.leniency.block = v;
                }
                if let Some(v) = get_attr_parsed(e, "inline")? {
                    self.leniency.inline = v;
                }
                if let Some(v) = get_attr_parsed(e, "static-content")? {
                    self.leniency.static_content = v;
                }
            }
            "font" => {
                if let Some(v) = get_attr(e, "family") {
                    self.font.family = v;
                }
                if let Some(v) = get_attr_parsed(e, "size")? {
                    self.font.size = v;
                }
                if let Some(v) = get_attr_parsed(e, "line-height")? {
                    self.font.line_height = v;
                }
                if let Some(v) = get_attr_parsed(e, "char-width")? {
                    self.font.char_width = v;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

fn get_attr_parsed<T: std::str::FromStr>(e: &BytesStart, name: &str) -> Result<Option<T>> {
    match get_attr(e, name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| FolioError::Config(format!("invalid value {:?} for attribute {}", raw, name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_overrides_only_what_it_names() {
        let config = LayoutConfig::from_xml_str(
            r#"<folio>
                 <layout max-backtrack="4"/>
                 <leniency flow="true" static-content="false"/>
                 <font size="10"/>
               </folio>"#,
        )
        .unwrap();
        assert_eq!(config.max_backtrack, 4);
        assert_eq!(config.orphans, 2);
        assert!(config.leniency.is_lenient(Construct::Flow));
        assert!(!config.leniency.is_lenient(Construct::StaticContent));
        assert!(config.leniency.is_lenient(Construct::Block));
        assert_eq!(config.font.size, 10.0);
        assert_eq!(config.font.family, "Helvetica");
    }

    #[test]
    fn xml_rejects_bad_numbers() {
        let err = LayoutConfig::from_xml_str(r#"<folio><layout widows="many"/></folio>"#).unwrap_err();
        assert!(matches!(err, FolioError::Config(_)));
    }

    #[test]
    fn json_uses_defaults_for_missing_fields() {
        let config = LayoutConfig::from_json_str(r#"{ "maxBacktrack": 2 }"#).unwrap();
        assert_eq!(config.max_backtrack, 2);
        assert_eq!(config.widows, 2);
        assert!(!config.leniency.flow);
    }
}
