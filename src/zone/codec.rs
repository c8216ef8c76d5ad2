//! Record-to-text encoding for zone master files.

use super::record::{RecordType, ResourceRecord};

/// Longest single `<character-string>` in a master file, in bytes
const MAX_CHARACTER_STRING: usize = 255;

/// Fields each structured type needs to render a complete line
pub fn required_fields(rtype: &RecordType) -> &'static [&'static str] {
    match rtype {
        RecordType::A | RecordType::AAAA => &["address"],
        RecordType::CNAME => &["target"],
        RecordType::NS => &["ns"],
        RecordType::MX => &["preference", "exchange"],
        RecordType::TXT => &["text"],
        RecordType::SOA => &[
            "ns", "mbox", "serial", "refresh", "retry", "expire", "minttl",
        ],
        RecordType::SRV => &["priority", "weight", "port", "target"],
        RecordType::PTR => &["ptr"],
        RecordType::Other(_) => &["raw"],
    }
}

/// Encode a record as a single zone-file line:
/// `<name> <ttl> <class> <type> <payload>`.
///
/// Never fails. Missing fields render as empty strings and the resulting
/// line is rejected later by the re-parse or the zone checker.
pub fn encode(record: &ResourceRecord) -> String {
    let name = if record.name.trim().is_empty() {
        "@"
    } else {
        record.name.trim()
    };

    format!(
        "{} {} {} {} {}",
        name,
        record.ttl,
        record.class,
        record.rtype,
        payload(record)
    )
}

fn payload(record: &ResourceRecord) -> String {
    let f = |key: &str| record.field(key);

    match record.rtype {
        RecordType::A | RecordType::AAAA => f("address").to_string(),
        RecordType::CNAME => f("target").to_string(),
        RecordType::NS => f("ns").to_string(),
        RecordType::MX => format!("{} {}", f("preference"), f("exchange")),
        RecordType::TXT => character_strings(f("text"))
            .iter()
            .map(|chunk| format!("\"{}\"", escape_character_string(chunk)))
            .collect::<Vec<_>>()
            .join(" "),
        RecordType::SOA => format!(
            "{} {} ({} {} {} {} {})",
            f("ns"),
            f("mbox"),
            f("serial"),
            f("refresh"),
            f("retry"),
            f("expire"),
            f("minttl")
        ),
        RecordType::SRV => format!(
            "{} {} {} {}",
            f("priority"),
            f("weight"),
            f("port"),
            f("target")
        ),
        RecordType::PTR => f("ptr").to_string(),
        RecordType::Other(_) => f("raw").to_string(),
    }
}

/// Split text into chunks of at most 255 bytes on char boundaries.
/// Adjacent quoted strings decode back to the joined text.
fn character_strings(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > MAX_CHARACTER_STRING {
        let mut end = MAX_CHARACTER_STRING;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks.push(rest);

    chunks
}

/// Escape text for use between double quotes. Control characters become
/// `\DDD` so the result always stays on one line.
pub(crate) fn escape_character_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            c if c.is_ascii_control() => escaped.push_str(&format!("\\{:03}", c as u8)),
            c => escaped.push(c),
        }
    }
    escaped
}
