//! Zone administration operations: the call contracts the admin API binds.
//!
//! Every mutation follows the same order: change the zone file, check it,
//! check the master configuration, reload. Each file touched is held in a
//! [`FileTransaction`] until the reload succeeds, so an error leaves the
//! zone file and the configuration as they were before the call.

use crate::config::AdminConfig;
use crate::error::{AdminError, Result};
use crate::registry::ZoneRegistry;
use crate::snapshot::FileTransaction;
use crate::toolchain::{ProcessRunner, ToolRunner, Toolchain};
use crate::validation::{validate_record, validate_zone, validate_zone_name};
use crate::zone::{ResourceRecord, Zone, ZoneFileStore, absolute_name};
use std::path::{self, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ZoneService {
    store: ZoneFileStore,
    registry: ZoneRegistry,
    toolchain: Arc<Toolchain>,
}

impl ZoneService {
    pub fn new(store: ZoneFileStore, registry: ZoneRegistry, toolchain: Arc<Toolchain>) -> Self {
        Self {
            store,
            registry,
            toolchain,
        }
    }

    /// Build the service from configuration, running tools through `runner`
    pub fn from_config(config: &AdminConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let toolchain = Arc::new(Toolchain::new(runner, config.tools.clone()));
        let store = ZoneFileStore::new(
            &config.nameserver.zone_dir,
            config.nameserver.default_ttl,
            toolchain.clone(),
        );
        let registry = ZoneRegistry::new(&config.nameserver.config_file, toolchain.clone());

        Self::new(store, registry, toolchain)
    }

    /// Service that runs the configured programs as child processes
    pub fn system(config: &AdminConfig) -> Self {
        Self::from_config(config, Arc::new(ProcessRunner))
    }

    pub fn store(&self) -> &ZoneFileStore {
        &self.store
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn list_zones(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    pub fn get_zone(&self, zone_name: &str) -> Result<Zone> {
        validate_zone_name(zone_name)?;
        self.store.read_zone(zone_name)
    }

    /// Write the zone file, declare the zone, then reload. The store and
    /// the registry have each run their checker by then; an unchanged
    /// configuration is checked here instead.
    /// An existing zone file of the same name is replaced.
    pub fn create_zone(&self, zone: &Zone) -> Result<String> {
        validate_zone(zone)?;
        let origin = zone.origin();
        let zone_path = self.store.zone_path(origin);

        let zone_tx = FileTransaction::begin(&zone_path)?;
        let config_tx = FileTransaction::begin(self.registry.config_file())?;
        let created = !zone_tx.snapshot().existed();

        self.store.write_full(zone)?;
        let declared = self.registry.add_zone(origin, &absolute_path(zone_path))?;
        if !declared {
            let check = self
                .toolchain
                .check_config_syntax(self.registry.config_file())?;
            if !check.ok {
                return Err(AdminError::config_syntax(check.output));
            }
        }
        let output = self.reload()?;

        config_tx.commit();
        zone_tx.commit();
        info!(
            "{} zone {} with {} records",
            if created { "Created" } else { "Rewrote" },
            origin,
            zone.records.len()
        );
        Ok(output)
    }

    /// Replace the zone file with raw master-file text
    pub fn replace_zone(&self, zone_name: &str, text: &str) -> Result<String> {
        validate_zone_name(zone_name)?;
        let zone_name = zone_name.trim_end_matches('.');

        let zone_tx = FileTransaction::begin(self.store.zone_path(zone_name))?;
        self.store.write_raw(zone_name, text)?;
        let output = self.check_and_reload(zone_name)?;

        zone_tx.commit();
        info!("Replaced zone {} from raw text", zone_name);
        Ok(output)
    }

    /// Remove the registry entry, then the zone file, then reload
    pub fn delete_zone(&self, zone_name: &str) -> Result<String> {
        validate_zone_name(zone_name)?;
        let zone_name = zone_name.trim_end_matches('.');

        let file_exists = self.store.exists(zone_name);
        if !file_exists && !self.registry.contains_zone(zone_name)? {
            return Err(AdminError::NotFound(format!("zone {}", zone_name)));
        }

        let config_tx = FileTransaction::begin(self.registry.config_file())?;
        let zone_tx = FileTransaction::begin(self.store.zone_path(zone_name))?;

        let removed = self.registry.remove_zone(zone_name)?;
        if removed == 0 {
            warn!(
                "Zone {} had no declaration in {}",
                zone_name,
                self.registry.config_file().display()
            );
        }

        if file_exists {
            self.store.delete(zone_name)?;
        }

        let output = self.reload()?;

        zone_tx.commit();
        config_tx.commit();
        info!("Deleted zone {}", zone_name);
        Ok(output)
    }

    /// Append one record to an existing zone
    pub fn add_record(&self, zone_name: &str, record: ResourceRecord) -> Result<String> {
        validate_zone_name(zone_name)?;
        validate_record(&record)?;
        let zone_name = zone_name.trim_end_matches('.');

        let mut zone = self.store.read_zone(zone_name)?;
        let zone_tx = FileTransaction::begin(self.store.zone_path(zone_name))?;

        info!(
            "Adding {} record {} to zone {}",
            record.rtype, record.name, zone_name
        );
        zone.records.push(record);
        self.store.write_full(&zone)?;
        let output = self.check_and_reload(zone_name)?;

        zone_tx.commit();
        Ok(output)
    }

    /// Remove every record whose owner and type match. Owners compare in
    /// absolute form, both owner and type case-insensitively.
    pub fn delete_record(&self, zone_name: &str, owner: &str, rtype: &str) -> Result<String> {
        validate_zone_name(zone_name)?;
        let zone_name = zone_name.trim_end_matches('.');

        let mut zone = self.store.read_zone(zone_name)?;
        let target = absolute_name(owner, zone_name).to_lowercase();
        let before = zone.records.len();

        zone.records.retain(|record| {
            let same_owner = absolute_name(&record.name, zone_name).to_lowercase() == target;
            let same_type = record.rtype.mnemonic().eq_ignore_ascii_case(rtype.trim());
            !(same_owner && same_type)
        });

        let removed = before - zone.records.len();
        if removed == 0 {
            return Err(AdminError::NotFound(format!(
                "record {} {} in zone {}",
                owner, rtype, zone_name
            )));
        }

        let zone_tx = FileTransaction::begin(self.store.zone_path(zone_name))?;
        self.store.write_full(&zone)?;
        let output = self.check_and_reload(zone_name)?;

        zone_tx.commit();
        info!(
            "Deleted {} {} record(s) named {} from zone {}",
            removed, rtype, owner, zone_name
        );
        Ok(output)
    }

    /// Zone check, config check, reload, for the zone as it is on disk
    pub fn check_and_reload(&self, zone_name: &str) -> Result<String> {
        let zone_name = zone_name.trim_end_matches('.');
        self.toolchain.check_and_reload(
            zone_name,
            &self.store.zone_path(zone_name),
            self.registry.config_file(),
        )
    }

    fn reload(&self) -> Result<String> {
        let reload = self.toolchain.reload()?;
        if !reload.ok {
            return Err(AdminError::Reload(reload.output));
        }
        Ok(reload.output)
    }
}

fn absolute_path(path: PathBuf) -> PathBuf {
    match path::absolute(&path) {
        Ok(absolute) => absolute,
        Err(_) => path,
    }
}
