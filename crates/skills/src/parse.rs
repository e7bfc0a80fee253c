//! SKILL.md frontmatter: splitting, decoding, and re-encoding.
//!
//! Decoding never fails. A document without a `---` block is all body; a
//! block that is not valid YAML (or not a mapping) decodes to an empty
//! [`Header`] and the problem is logged and kept in [`Document::header_error`].

use std::collections::BTreeMap;

use {
    serde_yaml::{Mapping, Value},
    tracing::warn,
};

use crate::{error::Result, types::Tool};

const MARKER: &str = "---";

/// Decoded frontmatter.
///
/// Known keys are typed. Everything else, including known keys whose value
/// has an unusable shape, is kept in `extra` (in document order) so a
/// rewrite does not drop it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub name: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub compatibility: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub tools: Option<Vec<Tool>>,
    pub extra: Mapping,
}

/// A SKILL.md split into header and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: Header,
    /// Everything after the closing marker line, byte for byte.
    pub body: String,
    /// Why the header block was discarded, if it was.
    pub header_error: Option<String>,
}

impl Header {
    /// Non-empty `name`, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Non-empty `description`, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut header = Self::default();

        for (key, value) in mapping {
            let Some(field) = key.as_str() else {
                header.extra.insert(key, value);
                continue;
            };
            if value.is_null() {
                continue;
            }
            let slot = match field {
                "name" => &mut header.name,
                "description" => &mut header.description,
                "license" => &mut header.license,
                "compatibility" => &mut header.compatibility,
                "metadata" => {
                    match value {
                        Value::Mapping(map) => header.metadata = Some(string_map(map)),
                        other => {
                            header.extra.insert(key, other);
                        },
                    }
                    continue;
                },
                "tools" => {
                    match serde_yaml::from_value::<Vec<Tool>>(value.clone()) {
                        Ok(tools) => header.tools = Some(tools),
                        Err(e) => {
                            warn!(error = %e, "ignoring malformed tools list");
                            header.extra.insert(key, value);
                        },
                    }
                    continue;
                },
                _ => {
                    header.extra.insert(key, value);
                    continue;
                },
            };
            match scalar_string(&value) {
                Some(s) => *slot = Some(s),
                None => {
                    header.extra.insert(key, value);
                },
            }
        }

        header
    }

    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();

        let strings = [
            ("name", &self.name),
            ("description", &self.description),
            ("license", &self.license),
            ("compatibility", &self.compatibility),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                mapping.insert(key.into(), Value::String(value.clone()));
            }
        }

        if let Some(metadata) = &self.metadata {
            let map: Mapping = metadata
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
                .collect();
            mapping.insert("metadata".into(), Value::Mapping(map));
        }

        if let Some(tools) = &self.tools {
            let list = tools.iter().map(tool_value).collect();
            mapping.insert("tools".into(), Value::Sequence(list));
        }

        for (key, value) in &self.extra {
            if !mapping.contains_key(key) {
                mapping.insert(key.clone(), value.clone());
            }
        }

        mapping
    }
}

/// Split and decode a SKILL.md.
pub fn parse_document(content: &str) -> Document {
    let Some((yaml, body)) = split_frontmatter(content) else {
        return Document {
            header: Header::default(),
            body: content.to_string(),
            header_error: None,
        };
    };

    match decode_header(yaml) {
        Ok(header) => Document {
            header,
            body: body.to_string(),
            header_error: None,
        },
        Err(reason) => {
            warn!(error = %reason, "invalid SKILL.md frontmatter, treating header as empty");
            Document {
                header: Header::default(),
                body: body.to_string(),
                header_error: Some(reason),
            }
        },
    }
}

/// Encode `header` and append `body` unchanged.
pub fn render_document(header: &Header, body: &str) -> Result<String> {
    let mapping = header.to_mapping();
    let yaml = if mapping.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(&mapping)?
    };
    Ok(format!("{MARKER}\n{yaml}{MARKER}\n{body}"))
}

/// Locate the frontmatter block. Returns `(yaml, body)`.
///
/// The opening marker must be the first line. The closing marker is the
/// first later line equal to `---` (trailing whitespace ignored); it may be
/// the last line of the file.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let (first, rest) = content.split_once('\n')?;
    if first.trim_end() != MARKER {
        return None;
    }

    let mut pos = 0;
    loop {
        let line_end = rest[pos..].find('\n').map(|i| pos + i);
        let line = &rest[pos..line_end.unwrap_or(rest.len())];
        if line.trim_end() == MARKER {
            let body = line_end.map_or("", |end| &rest[end + 1..]);
            return Some((&rest[..pos], body));
        }
        pos = line_end? + 1;
    }
}

fn decode_header(yaml: &str) -> std::result::Result<Header, String> {
    match serde_yaml::from_str::<Value>(yaml).map_err(|e| e.to_string())? {
        Value::Mapping(mapping) => Ok(Header::from_mapping(mapping)),
        Value::Null => Ok(Header::default()),
        other => Err(format!(
            "frontmatter must be a mapping, found {}",
            value_kind(&other)
        )),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten a `metadata` mapping to strings; nested values become compact JSON.
fn string_map(map: Mapping) -> BTreeMap<String, String> {
    map.into_iter()
        .filter_map(|(k, v)| {
            let key = scalar_string(&k)?;
            let value = match &v {
                Value::Null => String::new(),
                other => scalar_string(other).unwrap_or_else(|| {
                    serde_json::to_string(other)
                        .unwrap_or_else(|_| serde_yaml::to_string(other).unwrap_or_default())
                }),
            };
            Some((key, value))
        })
        .collect()
}

fn tool_value(tool: &Tool) -> Value {
    let mut map = Mapping::new();
    map.insert("name".into(), Value::String(tool.name.clone()));
    map.insert("script".into(), Value::String(tool.script.clone()));
    map.insert(
        "description".into(),
        Value::String(tool.description.clone()),
    );
    Value::Mapping(map)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
