//! Text bodies with cached rendered representations.
//!
//! A [`Content`] holds the raw bytes read from a chapter file or a config
//! field (`about = "..."`), plus any number of named renderings of those
//! bytes. The render stage fills in the `"html"` format once per value;
//! templates then read it as `chapter.content.html`.
//!
//! Serialized (for templates) as a map:
//!
//! ```text
//! { "raw": "# Heading\n...", "html": "<h1>Heading</h1>\n..." }
//! ```
//!
//! Inside the template engine, rendered formats are marked safe so
//! `{{ chapter.content.html }}` is not escaped a second time.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Name of the HTML rendering stored by the render stage.
pub const HTML: &str = "html";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    raw: Vec<u8>,
    formats: BTreeMap<String, String>,
}

impl Content {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: raw.into(),
            formats: BTreeMap::new(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Raw bytes as text, replacing invalid UTF-8 sequences.
    pub fn raw_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// A previously rendered format, if one was stored.
    pub fn format(&self, name: &str) -> Option<&str> {
        self.formats.get(name).map(String::as_str)
    }

    pub fn has_format(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Return the cached rendering for `name`, computing it with `render` on
    /// first use. Once a format is stored, `render` is never called again for
    /// this value.
    pub fn render_with<E>(
        &mut self,
        name: &str,
        render: impl FnOnce(&[u8]) -> Result<String, E>,
    ) -> Result<&str, E> {
        if !self.formats.contains_key(name) {
            let rendered = render(&self.raw)?;
            self.formats.insert(name.to_string(), rendered);
        }
        Ok(self.formats.get(name).map(String::as_str).unwrap_or_default())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.formats.len() + 1))?;
        map.serialize_entry("raw", &self.raw_text())?;
        let for_templates = minijinja::value::serializing_for_value();
        for (name, rendered) in &self.formats {
            if for_templates {
                map.serialize_entry(name, &minijinja::Value::from_safe_string(rendered.clone()))?;
            } else {
                map.serialize_entry(name, rendered)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Content::from)
    }
}
