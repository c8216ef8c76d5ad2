//! Zone declarations in the name server's master configuration.
//!
//! Edits are line based, not a grammar parse: a block starts at a line
//! containing `zone "<name>"` and ends at the next line containing `};`.
//! Existence checks match that same substring anywhere in the file, so a
//! comment mentioning `zone "<name>"` also counts as a declaration.
//!
//! The file is handled as bytes. Anything outside the edited blocks is
//! written back exactly as read, whatever its encoding.

use crate::error::{AdminError, Result};
use crate::snapshot::FileTransaction;
use crate::toolchain::Toolchain;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BLOCK_END: &[u8] = b"};";

pub struct ZoneRegistry {
    config_file: PathBuf,
    toolchain: Arc<Toolchain>,
}

impl ZoneRegistry {
    pub fn new<P: Into<PathBuf>>(config_file: P, toolchain: Arc<Toolchain>) -> Self {
        Self {
            config_file: config_file.into(),
            toolchain,
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn contains_zone(&self, zone_name: &str) -> Result<bool> {
        let content = fs::read(&self.config_file)?;
        Ok(has_declaration(&content, zone_name))
    }

    /// Declare `zone_name` as a master zone served from `zone_file`.
    ///
    /// Does nothing if a declaration already exists. Otherwise appends the
    /// block and runs the config checker, restoring the previous file on
    /// failure. Returns whether the file changed.
    pub fn add_zone(&self, zone_name: &str, zone_file: &Path) -> Result<bool> {
        let tx = FileTransaction::begin(&self.config_file)?;
        let Some(content) = tx.snapshot().bytes() else {
            tx.commit();
            return Err(missing_config(&self.config_file));
        };

        if has_declaration(content, zone_name) {
            debug!("Zone {} already declared in {}", zone_name, self.config_file.display());
            tx.commit();
            return Ok(false);
        }

        let mut updated = content.to_vec();
        if updated.last().is_some_and(|b| *b != b'\n') {
            updated.push(b'\n');
        }
        updated.extend_from_slice(zone_block(zone_name, zone_file).as_bytes());
        fs::write(&self.config_file, updated)?;

        let check = self.toolchain.check_config_syntax(&self.config_file)?;
        if !check.ok {
            return Err(AdminError::config_syntax(check.output));
        }

        tx.commit();
        info!("Declared zone {} in {}", zone_name, self.config_file.display());
        Ok(true)
    }

    /// Drop every block declaring `zone_name`, keeping all other lines in
    /// order. An unterminated block is reported and nothing is written.
    /// Returns the number of blocks removed.
    pub fn remove_zone(&self, zone_name: &str) -> Result<usize> {
        let tx = FileTransaction::begin(&self.config_file)?;
        let Some(content) = tx.snapshot().bytes() else {
            tx.commit();
            return Err(missing_config(&self.config_file));
        };

        let (kept, removed) = match strip_zone_blocks(content, zone_name) {
            Ok(result) => result,
            Err(e) => {
                tx.commit();
                return Err(e);
            }
        };

        if removed == 0 {
            debug!("No declaration of zone {} to remove", zone_name);
            tx.commit();
            return Ok(0);
        }

        fs::write(&self.config_file, kept)?;

        let check = self.toolchain.check_config_syntax(&self.config_file)?;
        if !check.ok {
            return Err(AdminError::config_syntax(check.output));
        }

        tx.commit();
        info!(
            "Removed {} declaration(s) of zone {} from {}",
            removed,
            zone_name,
            self.config_file.display()
        );
        Ok(removed)
    }
}

fn zone_marker(zone_name: &str) -> String {
    format!("zone \"{}\"", zone_name)
}

fn contains(line: &[u8], needle: &[u8]) -> bool {
    line.windows(needle.len()).any(|window| window == needle)
}

fn has_declaration(content: &[u8], zone_name: &str) -> bool {
    let marker = zone_marker(zone_name);
    content
        .split(|b| *b == b'\n')
        .any(|line| contains(line, marker.as_bytes()))
}

fn zone_block(zone_name: &str, zone_file: &Path) -> String {
    format!(
        "zone \"{}\" {{\n    type master;\n    file \"{}\";\n}};\n",
        zone_name,
        zone_file.display()
    )
}

fn missing_config(path: &Path) -> AdminError {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("name server config {} does not exist", path.display()),
    )
    .into()
}

/// Linear scan removing `zone "<name>"` blocks
fn strip_zone_blocks(content: &[u8], zone_name: &str) -> Result<(Vec<u8>, usize)> {
    let marker = zone_marker(zone_name);
    let marker = marker.as_bytes();
    let mut kept = Vec::new();
    let mut removed = 0;
    let mut open_block: Option<usize> = None;

    for (idx, line) in content.split(|b| *b == b'\n').enumerate() {
        if open_block.is_some() {
            if contains(line, BLOCK_END) {
                open_block = None;
            }
            continue;
        }

        if contains(line, marker) {
            removed += 1;
            if !contains(line, BLOCK_END) {
                open_block = Some(idx + 1);
            }
            continue;
        }

        kept.push(line);
    }

    if let Some(start) = open_block {
        return Err(AdminError::Parse(format!(
            "unterminated block for zone \"{}\" starting at line {}",
            zone_name, start
        )));
    }

    Ok((kept.join(&b'\n'), removed))
}
