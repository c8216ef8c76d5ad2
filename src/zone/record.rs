use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Record types with a dedicated field layout; everything else is `Other`
/// and carries its payload verbatim in the `raw` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    NS,
    MX,
    TXT,
    SOA,
    SRV,
    PTR,
    Other(String),
}

impl RecordType {
    pub fn mnemonic(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::NS => "NS",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::SOA => "SOA",
            RecordType::SRV => "SRV",
            RecordType::PTR => "PTR",
            RecordType::Other(name) => name,
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::AAAA,
            "CNAME" => RecordType::CNAME,
            "NS" => RecordType::NS,
            "MX" => RecordType::MX,
            "TXT" => RecordType::TXT,
            "SOA" => RecordType::SOA,
            "SRV" => RecordType::SRV,
            "PTR" => RecordType::PTR,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        RecordType::from(s.as_str())
    }
}

impl From<RecordType> for String {
    fn from(rtype: RecordType) -> Self {
        rtype.mnemonic().to_string()
    }
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordType::from(s))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Record class (usually IN)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordClass {
    #[default]
    IN,
    CH,
    HS,
    CS,
}

impl RecordClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "IN" => Some(RecordClass::IN),
            "CH" => Some(RecordClass::CH),
            "HS" => Some(RecordClass::HS),
            "CS" => Some(RecordClass::CS),
            _ => None,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordClass::IN => "IN",
            RecordClass::CH => "CH",
            RecordClass::HS => "HS",
            RecordClass::CS => "CS",
        };
        f.write_str(s)
    }
}

/// A single resource record in structured form.
///
/// `fields` is keyed by type: `address` for A/AAAA, `target` for CNAME,
/// `ns` for NS, `preference`/`exchange` for MX, `text` for TXT,
/// `ns`/`mbox`/`serial`/`refresh`/`retry`/`expire`/`minttl` for SOA,
/// `priority`/`weight`/`port`/`target` for SRV, `ptr` for PTR and
/// `raw` for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: RecordType,
    #[serde(default)]
    pub class: RecordClass,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl ResourceRecord {
    pub fn new(name: impl Into<String>, rtype: RecordType, ttl: u32) -> Self {
        Self {
            name: name.into(),
            rtype,
            class: RecordClass::IN,
            ttl,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }
}

/// A zone as submitted by API clients: origin, default TTL and ordered records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub records: Vec<ResourceRecord>,
}

impl Zone {
    pub fn new(name: impl Into<String>, ttl: Option<u32>, records: Vec<ResourceRecord>) -> Self {
        Self {
            name: name.into(),
            ttl,
            records,
        }
    }

    /// Zone name without a trailing dot
    pub fn origin(&self) -> &str {
        self.name.trim_end_matches('.')
    }
}

/// Render `name` in absolute form relative to `origin`.
///
/// `@` and the empty name become the origin itself; names ending in `.`
/// are already absolute. Comparison helpers lowercase the result.
pub fn absolute_name(name: &str, origin: &str) -> String {
    let name = name.trim();
    let origin = origin.trim_end_matches('.');

    if name == "@" || name.is_empty() {
        format!("{}.", origin)
    } else if name.ends_with('.') {
        name.to_string()
    } else if origin.is_empty() {
        format!("{}.", name)
    } else {
        format!("{}.{}.", name, origin)
    }
}
