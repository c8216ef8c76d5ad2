//! Checks applied to client-supplied zone names and records before they
//! touch the filesystem.

use crate::error::{AdminError, Result};
use crate::zone::{ResourceRecord, Zone};

const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// Validate a zone name used as origin and as zone file key.
///
/// Accepts letters, digits, `-` and `_` in dot-separated labels, with an
/// optional trailing dot. Anything that could leave the zone directory is
/// rejected.
pub fn validate_zone_name(name: &str) -> Result<()> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AdminError::Validation(format!(
            "zone name contains a path separator: {}",
            name
        )));
    }

    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(AdminError::Validation("zone name is required".to_string()));
    }

    if trimmed.len() > MAX_DOMAIN_LENGTH {
        return Err(AdminError::Validation(format!(
            "zone name too long: {} bytes",
            trimmed.len()
        )));
    }

    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(AdminError::Validation(format!(
                "empty label in zone name: {}",
                name
            )));
        }

        if label.len() > MAX_LABEL_LENGTH {
            return Err(AdminError::Validation(format!(
                "label too long: {} bytes",
                label.len()
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AdminError::Validation(format!(
                "invalid characters in label: {}",
                label
            )));
        }
    }

    Ok(())
}

/// Shape check for an inbound record. Whether the fields suit the type is
/// left to the zone writer, which reports it as a syntax error.
pub fn validate_record(record: &ResourceRecord) -> Result<()> {
    let owner = record.name.trim();
    if owner.is_empty() {
        return Err(AdminError::Validation("record name is required".to_string()));
    }
    if owner.chars().any(char::is_whitespace) {
        return Err(AdminError::Validation(format!(
            "record name contains whitespace: {:?}",
            record.name
        )));
    }

    if record.rtype.mnemonic().trim().is_empty() {
        return Err(AdminError::Validation("record type is required".to_string()));
    }

    // A record is exactly one line of the zone file
    if let Some((key, _)) = record
        .fields
        .iter()
        .find(|(key, value)| key.chars().chain(value.chars()).any(char::is_control))
    {
        return Err(AdminError::Validation(format!(
            "record field {} contains control characters",
            key
        )));
    }

    Ok(())
}

/// Zone name plus every record
pub fn validate_zone(zone: &Zone) -> Result<()> {
    validate_zone_name(&zone.name)?;
    zone.records.iter().try_for_each(validate_record)
}
