//! External name-server tooling: zone checker, config checker and reload.

use crate::error::{AdminError, Result};
use serde::Deserialize;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Captured result of one external program run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Narrow seam over process execution so tests can substitute a fake
pub trait ToolRunner: Send + Sync {
    fn run_tool(&self, program: &str, args: &[&str]) -> io::Result<ToolOutput>;
}

/// Runs tools as blocking child processes. There is no timeout: a hung
/// tool stalls the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run_tool(&self, program: &str, args: &[&str]) -> io::Result<ToolOutput> {
        debug!("Running {} {:?}", program, args);
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Program names for the checker and reload tools
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolCommands {
    /// Zone checker, invoked as `<check_zone> <zone> <file>`
    pub check_zone: String,
    /// Config checker, invoked as `<check_config> <file>`
    pub check_config: String,
    /// Reload trigger: program followed by its fixed arguments
    pub reload: Vec<String>,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            check_zone: "named-checkzone".to_string(),
            check_config: "named-checkconf".to_string(),
            reload: vec!["rndc".to_string(), "reload".to_string()],
        }
    }
}

/// `(ok, output)` pair from a checker or reload run.
///
/// On failure `output` is the tool's stderr, or its stdout when stderr is
/// empty (BIND's checkers report diagnostics on stdout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub ok: bool,
    pub output: String,
}

impl From<ToolOutput> for CheckOutcome {
    fn from(out: ToolOutput) -> Self {
        let output = if out.success || out.stderr.trim().is_empty() {
            out.stdout
        } else {
            out.stderr
        };

        CheckOutcome {
            ok: out.success,
            output,
        }
    }
}

/// Validation and reload pipeline
pub struct Toolchain {
    runner: Arc<dyn ToolRunner>,
    commands: ToolCommands,
}

impl Toolchain {
    pub fn new(runner: Arc<dyn ToolRunner>, commands: ToolCommands) -> Self {
        Self { runner, commands }
    }

    /// Toolchain backed by real child processes
    pub fn system(commands: ToolCommands) -> Self {
        Self::new(Arc::new(ProcessRunner), commands)
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<CheckOutcome> {
        let output = self.runner.run_tool(program, args).map_err(|e| {
            AdminError::from(io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", program, e),
            ))
        })?;

        let outcome = CheckOutcome::from(output);
        if !outcome.ok {
            warn!("{} {:?} failed: {}", program, args, outcome.output.trim());
        }
        Ok(outcome)
    }

    pub fn check_zone_syntax(&self, zone_name: &str, zone_file: &Path) -> Result<CheckOutcome> {
        let file = zone_file.to_string_lossy();
        self.run(&self.commands.check_zone, &[zone_name, &*file])
    }

    pub fn check_config_syntax(&self, config_file: &Path) -> Result<CheckOutcome> {
        let file = config_file.to_string_lossy();
        self.run(&self.commands.check_config, &[&*file])
    }

    pub fn reload(&self) -> Result<CheckOutcome> {
        let (program, args) = self
            .commands
            .reload
            .split_first()
            .ok_or_else(|| AdminError::Validation("reload command is empty".to_string()))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(program, &args)
    }

    /// Zone check, then config check, then reload. The first failure stops
    /// the sequence, so the server only reloads a configuration that passed
    /// both checks. Returns the reload output on success.
    pub fn check_and_reload(
        &self,
        zone_name: &str,
        zone_file: &Path,
        config_file: &Path,
    ) -> Result<String> {
        let zone = self.check_zone_syntax(zone_name, zone_file)?;
        if !zone.ok {
            return Err(AdminError::zone_syntax(zone_name, zone.output));
        }

        let config = self.check_config_syntax(config_file)?;
        if !config.ok {
            return Err(AdminError::config_syntax(config.output));
        }

        let reload = self.reload()?;
        if !reload.ok {
            return Err(AdminError::Reload(reload.output));
        }

        info!("Name server reloaded after changes to zone {}", zone_name);
        Ok(reload.output)
    }
}
