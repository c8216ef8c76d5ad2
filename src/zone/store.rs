use super::codec::encode;
use super::constants::ZONE_FILE_SUFFIX;
use super::parser::ZoneParser;
use super::record::{ResourceRecord, Zone};
use crate::error::{AdminError, Result};
use crate::snapshot::FileTransaction;
use crate::toolchain::Toolchain;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the zone directory: one `<name>.zone` file per zone.
///
/// Writes are all-or-nothing: a file that fails the single-record re-parse
/// or the external zone checker is put back to its previous bytes (or
/// removed, if it did not exist before).
pub struct ZoneFileStore {
    zone_dir: PathBuf,
    default_ttl: u32,
    toolchain: Arc<Toolchain>,
}

impl ZoneFileStore {
    pub fn new<P: Into<PathBuf>>(zone_dir: P, default_ttl: u32, toolchain: Arc<Toolchain>) -> Self {
        Self {
            zone_dir: zone_dir.into(),
            default_ttl,
            toolchain,
        }
    }

    /// Path of the file backing `zone_name`
    pub fn zone_path(&self, zone_name: &str) -> PathBuf {
        self.zone_dir
            .join(format!("{}{}", zone_name.trim_end_matches('.'), ZONE_FILE_SUFFIX))
    }

    pub fn exists(&self, zone_name: &str) -> bool {
        self.zone_path(zone_name).is_file()
    }

    /// Decode the zone file into records, in file order
    pub fn read(&self, zone_name: &str) -> Result<Vec<ResourceRecord>> {
        let path = self.zone_path(zone_name);
        debug!("Reading zone file: {}", path.display());

        let mut parser = ZoneParser::new(zone_name).with_default_ttl(self.default_ttl);
        parser.parse_file(&path).map_err(|e| not_found_or(e, zone_name))
    }

    /// Decode the zone file into a [`Zone`], keeping its `$TTL` if present
    pub fn read_zone(&self, zone_name: &str) -> Result<Zone> {
        let path = self.zone_path(zone_name);
        let mut parser = ZoneParser::new(zone_name).with_default_ttl(self.default_ttl);
        let records = parser
            .parse_file(&path)
            .map_err(|e| not_found_or(e, zone_name))?;

        Ok(Zone::new(
            zone_name.trim_end_matches('.'),
            parser.zone_ttl(),
            records,
        ))
    }

    pub fn read_raw(&self, zone_name: &str) -> Result<String> {
        fs::read_to_string(self.zone_path(zone_name))
            .map_err(|e| not_found_or(AdminError::from(e), zone_name))
    }

    /// Replace the whole zone file with `zone`.
    ///
    /// Emits `$ORIGIN`, then `$TTL` (zone TTL, or the configured default
    /// when zero or absent), then one line per record in the given order.
    /// Each line must re-parse on its own and the finished file must pass
    /// the zone checker, otherwise the previous content is restored.
    pub fn write_full(&self, zone: &Zone) -> Result<()> {
        let origin = zone.origin();
        let ttl = zone
            .ttl
            .filter(|ttl| *ttl > 0)
            .unwrap_or(self.default_ttl);

        fs::create_dir_all(&self.zone_dir)?;
        let path = self.zone_path(origin);
        let tx = FileTransaction::begin(&path)?;

        info!(
            "Writing zone {} ({} records) to {}",
            origin,
            zone.records.len(),
            path.display()
        );

        self.write_records(&path, origin, ttl, &zone.records)?;

        let check = self.toolchain.check_zone_syntax(origin, &path)?;
        if !check.ok {
            return Err(AdminError::zone_syntax(origin, check.output));
        }

        tx.commit();
        Ok(())
    }

    fn write_records(
        &self,
        path: &Path,
        origin: &str,
        ttl: u32,
        records: &[ResourceRecord],
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "$ORIGIN {}.", origin)?;
        if ttl > 0 {
            writeln!(writer, "$TTL {}", ttl)?;
        }
        writeln!(writer)?;

        let mut parser = ZoneParser::new(origin).with_default_ttl(ttl);
        for record in records {
            let line = encode(record);
            parser
                .parse_record(&line)
                .map_err(|e| AdminError::zone_syntax(origin, format!("{}: {}", line, e)))?;
            writeln!(writer, "{}", line)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Replace the zone file with raw master-file text, validated by the
    /// zone checker. The file must already exist.
    pub fn write_raw(&self, zone_name: &str, text: &str) -> Result<()> {
        let path = self.zone_path(zone_name);
        let tx = FileTransaction::begin(&path)?;
        if !tx.snapshot().existed() {
            tx.commit();
            return Err(AdminError::NotFound(format!("zone {}", zone_name)));
        }

        fs::write(&path, text)?;

        let check = self.toolchain.check_zone_syntax(zone_name, &path)?;
        if !check.ok {
            return Err(AdminError::zone_syntax(zone_name, check.output));
        }

        tx.commit();
        Ok(())
    }

    /// Remove the zone file. Not reversible.
    pub fn delete(&self, zone_name: &str) -> Result<()> {
        let path = self.zone_path(zone_name);
        fs::remove_file(&path).map_err(|e| not_found_or(AdminError::from(e), zone_name))?;
        info!("Deleted zone file {}", path.display());
        Ok(())
    }

    /// Names of all zones with a file in the zone directory, sorted.
    /// A missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.zone_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut zones = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(zone) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(ZONE_FILE_SUFFIX))
            {
                if !zone.is_empty() {
                    zones.push(zone.to_string());
                }
            }
        }

        zones.sort();
        Ok(zones)
    }
}

fn not_found_or(err: AdminError, zone_name: &str) -> AdminError {
    if let AdminError::Io(source) = &err {
        if source.kind() == io::ErrorKind::NotFound {
            return AdminError::NotFound(format!("zone {}", zone_name));
        }
    }
    err
}
