use super::codec::{escape_character_string, required_fields};
use super::constants;
use super::record::{RecordClass, RecordType, ResourceRecord, absolute_name};
use crate::error::{AdminError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, trace};

/// Mnemonics accepted as record types beyond the structured ones.
/// They decode to `RecordType::Other` with the payload kept in `raw`.
const OTHER_TYPES: &[&str] = &[
    "AFSDB", "APL", "CAA", "CDNSKEY", "CDS", "CERT", "CSYNC", "DHCID", "DLV", "DNAME", "DNSKEY",
    "DS", "EUI48", "EUI64", "HINFO", "HIP", "HTTPS", "IPSECKEY", "KEY", "KX", "LOC", "MINFO",
    "NAPTR", "NSEC", "NSEC3", "NSEC3PARAM", "OPENPGPKEY", "RP", "RRSIG", "SIG", "SMIMEA", "SPF",
    "SSHFP", "SVCB", "TLSA", "URI", "ZONEMD",
];

/// A lexical token from a record line. Quoted strings keep their
/// unescaped contents and remember that they were quoted.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
}

/// RFC 1035 master-file reader producing structured records.
///
/// Owner names and domain-valued fields come back in absolute form.
pub struct ZoneParser {
    /// Current origin, without trailing dot
    origin: String,
    /// TTL from the most recent `$TTL` directive
    current_ttl: Option<u32>,
    /// Fallback TTL when neither the record nor `$TTL` gives one
    default_ttl: u32,
    /// Class inherited by records that omit it
    current_class: RecordClass,
    /// Owner of the previous record, for lines starting with whitespace
    last_owner: Option<String>,
    /// Line number for error reporting
    line_number: usize,
}

impl ZoneParser {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('.').to_string(),
            current_ttl: None,
            default_ttl: constants::DEFAULT_TTL,
            current_class: RecordClass::IN,
            last_owner: None,
            line_number: 0,
        }
    }

    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// TTL set by the last `$TTL` directive seen, if any
    pub fn zone_ttl(&self) -> Option<u32> {
        self.current_ttl
    }

    /// Parse a zone file from path
    pub fn parse_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<ResourceRecord>> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        if contents.len() > constants::MAX_ZONE_FILE_SIZE {
            return Err(AdminError::Parse(format!(
                "{} exceeds maximum zone file size",
                path.display()
            )));
        }

        self.parse(&contents)
    }

    /// Parse zone file contents into records, in file order
    pub fn parse(&mut self, contents: &str) -> Result<Vec<ResourceRecord>> {
        self.line_number = 0;
        let mut records = Vec::new();

        let mut multi_line_buffer = String::new();
        let mut paren_depth = 0i32;
        let mut paren_start_line = 0;

        for raw_line in contents.lines() {
            self.line_number += 1;
            let line = strip_comments(raw_line);

            if paren_depth > 0 {
                multi_line_buffer.push(' ');
                multi_line_buffer.push_str(line.trim());
                paren_depth += paren_delta(line);

                if paren_depth <= 0 {
                    paren_depth = 0;
                    let complete = std::mem::take(&mut multi_line_buffer);
                    let record = self.parse_line(&complete).map_err(|e| {
                        AdminError::Parse(format!(
                            "lines {}-{}: {}",
                            paren_start_line, self.line_number, e
                        ))
                    })?;
                    records.push(record);
                }
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            trace!("Parsing line {}: {}", self.line_number, line);

            if line.trim_start().starts_with('$') {
                self.parse_directive(line)
                    .map_err(|e| AdminError::Parse(format!("line {}: {}", self.line_number, e)))?;
                continue;
            }

            let delta = paren_delta(line);
            if delta > 0 {
                paren_depth = delta;
                paren_start_line = self.line_number;
                multi_line_buffer = line.to_string();
                continue;
            }

            let record = self
                .parse_line(line)
                .map_err(|e| AdminError::Parse(format!("line {}: {}", self.line_number, e)))?;
            records.push(record);
        }

        if paren_depth > 0 {
            return Err(AdminError::Parse(format!(
                "unclosed parentheses starting at line {}",
                paren_start_line
            )));
        }

        debug!(
            "Parsed {} records for origin {}",
            records.len(),
            self.origin
        );

        Ok(records)
    }

    /// Parse one resource record in isolation, e.g. a freshly encoded line.
    pub fn parse_record(&mut self, line: &str) -> Result<ResourceRecord> {
        if line.contains(['\n', '\r']) {
            return Err(AdminError::Parse(
                "record spans more than one line".to_string(),
            ));
        }
        let line = strip_comments(line);
        if line.trim_start().starts_with('$') {
            return Err(AdminError::Parse(format!(
                "expected a resource record, found directive: {}",
                line.trim()
            )));
        }
        if paren_delta(line) != 0 {
            return Err(AdminError::Parse("unbalanced parentheses".to_string()));
        }
        self.parse_line(line).map_err(AdminError::Parse)
    }

    fn parse_directive(&mut self, line: &str) -> std::result::Result<(), String> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0].to_uppercase().as_str() {
            "$ORIGIN" => {
                let origin = parts
                    .get(1)
                    .ok_or_else(|| "$ORIGIN requires domain name".to_string())?;
                let absolute = absolute_name(origin, &self.origin);
                self.origin = absolute.trim_end_matches('.').to_string();
                debug!("Set origin to: {}", self.origin);
            }
            "$TTL" => {
                let value = parts
                    .get(1)
                    .ok_or_else(|| "$TTL requires value".to_string())?;
                let ttl = parse_ttl(value).ok_or_else(|| format!("invalid TTL: {}", value))?;
                self.current_ttl = Some(ttl);
                debug!("Set default TTL to: {}", ttl);
            }
            "$INCLUDE" => return Err("$INCLUDE is not permitted".to_string()),
            other => return Err(format!("unknown directive: {}", other)),
        }

        Ok(())
    }

    fn parse_line(&mut self, line: &str) -> std::result::Result<ResourceRecord, String> {
        let tokens = tokenize(line)?;
        if tokens.is_empty() {
            return Err("empty record line".to_string());
        }

        let mut idx = 0;
        let owner = if line.starts_with(' ') || line.starts_with('\t') {
            self.last_owner
                .clone()
                .ok_or_else(|| "no previous owner name to inherit".to_string())?
        } else {
            idx += 1;
            absolute_name(&tokens[0].text, &self.origin)
        };

        let mut ttl = None;
        let mut class = self.current_class;
        let mut rtype = None;

        while idx < tokens.len() {
            let token = &tokens[idx];
            idx += 1;
            if token.quoted {
                return Err(format!("unexpected quoted string: \"{}\"", token.text));
            }
            if ttl.is_none() {
                if let Some(value) = parse_ttl(&token.text) {
                    ttl = Some(value);
                    continue;
                }
            }
            if let Some(parsed) = RecordClass::parse(&token.text) {
                class = parsed;
                continue;
            }
            match parse_type(&token.text) {
                Some(parsed) => {
                    rtype = Some(parsed);
                    break;
                }
                None => return Err(format!("invalid field: {}", token.text)),
            }
        }

        let rtype = rtype.ok_or_else(|| "missing record type".to_string())?;
        let rdata = &tokens[idx..];
        if rdata.is_empty() {
            return Err("missing RDATA".to_string());
        }

        let fields = self.parse_fields(&rtype, rdata)?;
        self.last_owner = Some(owner.clone());

        Ok(ResourceRecord {
            name: owner,
            rtype,
            class,
            ttl: ttl.or(self.current_ttl).unwrap_or(self.default_ttl),
            fields,
        })
    }

    fn parse_fields(
        &self,
        rtype: &RecordType,
        rdata: &[Token],
    ) -> std::result::Result<BTreeMap<String, String>, String> {
        let mut fields = BTreeMap::new();

        match rtype {
            RecordType::TXT => {
                // Adjacent quoted strings concatenate, bare words keep a space
                let mut text = String::new();
                for (i, token) in rdata.iter().enumerate() {
                    if i > 0 && !(token.quoted && rdata[i - 1].quoted) {
                        text.push(' ');
                    }
                    text.push_str(&token.text);
                }
                fields.insert("text".to_string(), text);
                return Ok(fields);
            }
            RecordType::Other(_) => {
                let raw: Vec<String> = rdata.iter().map(render_token).collect();
                fields.insert("raw".to_string(), raw.join(" "));
                return Ok(fields);
            }
            _ => {}
        }

        let names = required_fields(rtype);
        if rdata.len() != names.len() {
            return Err(format!(
                "{} record requires {} fields, got {}",
                rtype,
                names.len(),
                rdata.len()
            ));
        }

        for (key, token) in names.iter().zip(rdata) {
            if token.quoted {
                return Err(format!("unexpected quoted string in {} record", rtype));
            }
            let value = self.parse_field(rtype, key, &token.text)?;
            fields.insert(key.to_string(), value);
        }

        Ok(fields)
    }

    fn parse_field(
        &self,
        rtype: &RecordType,
        key: &str,
        value: &str,
    ) -> std::result::Result<String, String> {
        match (rtype, key) {
            (RecordType::A, _) => value
                .parse::<Ipv4Addr>()
                .map(|a| a.to_string())
                .map_err(|_| format!("invalid IPv4 address: {}", value)),
            (RecordType::AAAA, _) => value
                .parse::<Ipv6Addr>()
                .map(|a| a.to_string())
                .map_err(|_| format!("invalid IPv6 address: {}", value)),
            (RecordType::MX, "preference")
            | (RecordType::SRV, "priority")
            | (RecordType::SRV, "weight")
            | (RecordType::SRV, "port") => value
                .parse::<u16>()
                .map(|n| n.to_string())
                .map_err(|_| format!("invalid {} {}: {}", rtype, key, value)),
            (RecordType::SOA, "serial") => value
                .parse::<u32>()
                .map(|n| n.to_string())
                .map_err(|_| format!("invalid SOA serial: {}", value)),
            (RecordType::SOA, "refresh" | "retry" | "expire" | "minttl") => parse_ttl(value)
                .map(|n| n.to_string())
                .ok_or_else(|| format!("invalid SOA {}: {}", key, value)),
            _ => self.parse_domain_name(value),
        }
    }

    fn parse_domain_name(&self, name: &str) -> std::result::Result<String, String> {
        let absolute = absolute_name(name, &self.origin);
        for label in absolute.trim_end_matches('.').split('.') {
            if label.is_empty() && absolute != "." {
                return Err(format!("empty label in domain name: {}", name));
            }
            if label.len() > 63 {
                return Err(format!("label too long: {}", label));
            }
        }
        Ok(absolute)
    }
}

/// Strip a trailing `;` comment, ignoring semicolons inside quotes
fn strip_comments(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;

    for (pos, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..pos],
            _ => {}
        }
    }

    line
}

/// Net parenthesis depth change of a line, outside quoted strings
fn paren_delta(line: &str) -> i32 {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0;

    for ch in line.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth -= 1,
            _ => {}
        }
    }

    depth
}

/// Split a line into tokens, respecting quoted strings and dropping
/// grouping parentheses. Inside quotes `\DDD` is a decimal byte escape.
fn tokenize(line: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = Vec::new();
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '\\' => match chars.next() {
                    Some(d) if d.is_ascii_digit() => quoted.push(decimal_escape(d, &mut chars)?),
                    Some(next) => push_char(&mut quoted, next),
                    None => return Err("dangling escape in quoted string".to_string()),
                },
                '"' => {
                    let text = String::from_utf8(std::mem::take(&mut quoted))
                        .map_err(|_| "quoted string is not valid UTF-8".to_string())?;
                    tokens.push(Token { text, quoted: true });
                    in_quotes = false;
                }
                _ => push_char(&mut quoted, ch),
            }
            continue;
        }

        match ch {
            '"' => {
                flush(&mut current, &mut tokens);
                in_quotes = true;
            }
            '(' | ')' | ' ' | '\t' => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    flush(&mut current, &mut tokens);

    Ok(tokens)
}

fn push_char(bytes: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

/// `\DDD` with the first digit already consumed
fn decimal_escape(
    first: char,
    chars: &mut std::str::Chars<'_>,
) -> std::result::Result<u8, String> {
    let mut digits = String::from(first);
    for _ in 0..2 {
        match chars.next() {
            Some(d) if d.is_ascii_digit() => digits.push(d),
            _ => return Err(format!("malformed escape \\{}", digits)),
        }
    }
    digits
        .parse::<u8>()
        .map_err(|_| format!("escape out of range: \\{}", digits))
}

fn flush(current: &mut String, tokens: &mut Vec<Token>) {
    if !current.is_empty() {
        tokens.push(Token {
            text: std::mem::take(current),
            quoted: false,
        });
    }
}

fn render_token(token: &Token) -> String {
    if token.quoted {
        format!("\"{}\"", escape_character_string(&token.text))
    } else {
        token.text.clone()
    }
}

/// Parse TTL value (supports suffixes like 1h, 30m, 1h30m)
fn parse_ttl(s: &str) -> Option<u32> {
    let s = s.to_lowercase();
    if s.is_empty() || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(seconds) = s.parse::<u32>() {
        return Some(seconds);
    }

    let mut total: u32 = 0;
    let mut number = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let multiplier = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return None,
        };
        let value: u32 = number.parse().ok()?;
        total = total.checked_add(value.checked_mul(multiplier)?)?;
        number.clear();
    }

    if !number.is_empty() {
        return None;
    }
    Some(total)
}

/// Parse a record type mnemonic or generic `TYPEnnn`
fn parse_type(s: &str) -> Option<RecordType> {
    let upper = s.to_uppercase();
    let rtype = RecordType::from(upper.as_str());

    match &rtype {
        RecordType::Other(name) => {
            let generic = name
                .strip_prefix("TYPE")
                .is_some_and(|n| !n.is_empty() && n.parse::<u16>().is_ok());
            if generic || OTHER_TYPES.contains(&name.as_str()) {
                Some(rtype)
            } else {
                None
            }
        }
        _ => Some(rtype),
    }
}
