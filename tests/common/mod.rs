//! Shared fixtures for zonekeeper integration tests: a temp directory
//! laid out like a name server's config area and a scripted tool runner.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zonekeeper::{
    ZoneService,
    config::AdminConfig,
    toolchain::{ToolOutput, ToolRunner},
    zone::{RecordType, ResourceRecord, Zone},
};

pub const NAMED_CONF: &str = "options {\n    directory \"/var/cache/bind\";\n};\n";

/// Fake toolchain: every program succeeds unless told to fail, and every
/// invocation is recorded as `[program, args...]`
#[derive(Default)]
pub struct ScriptedRunner {
    failures: Mutex<HashMap<String, ToolOutput>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `program` fail with the given streams from now on
    pub fn fail(&self, program: &str, stdout: &str, stderr: &str) {
        self.failures.lock().unwrap().insert(
            program.to_string(),
            ToolOutput {
                success: false,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
    }

    pub fn recover(&self, program: &str) {
        self.failures.lock().unwrap().remove(program);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call[0] == program)
            .count()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl ToolRunner for ScriptedRunner {
    fn run_tool(&self, program: &str, args: &[&str]) -> io::Result<ToolOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|arg| arg.to_string()));
        self.calls.lock().unwrap().push(call);

        if let Some(failure) = self.failures.lock().unwrap().get(program) {
            return Ok(failure.clone());
        }

        Ok(ToolOutput {
            success: true,
            stdout: format!("{} OK", program),
            stderr: String::new(),
        })
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub runner: Arc<ScriptedRunner>,
    pub config: AdminConfig,
    pub service: Arc<ZoneService>,
}

impl Fixture {
    pub fn zone_dir(&self) -> PathBuf {
        self.config.nameserver.zone_dir.clone()
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.nameserver.config_file.clone()
    }

    pub fn zone_file(&self, zone: &str) -> PathBuf {
        self.zone_dir().join(format!("{}.zone", zone))
    }

    pub fn read_zone_file(&self, zone: &str) -> String {
        fs::read_to_string(self.zone_file(zone)).unwrap()
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.config_file()).unwrap()
    }
}

/// Temp layout with a `zones/` directory (not yet created) and a
/// `named.conf.local` holding only an options block
pub fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();

    let mut config = AdminConfig::default();
    config.nameserver.zone_dir = dir.path().join("zones");
    config.nameserver.config_file = dir.path().join("named.conf.local");
    config.nameserver.default_ttl = 3600;
    fs::write(&config.nameserver.config_file, NAMED_CONF).unwrap();

    let service = Arc::new(ZoneService::from_config(&config, runner.clone()));

    Fixture {
        dir,
        runner,
        config,
        service,
    }
}

pub fn soa(origin: &str) -> ResourceRecord {
    ResourceRecord::new("@", RecordType::SOA, 3600)
        .with_field("ns", format!("ns1.{}.", origin))
        .with_field("mbox", format!("hostmaster.{}.", origin))
        .with_field("serial", "2024010101")
        .with_field("refresh", "3600")
        .with_field("retry", "900")
        .with_field("expire", "604800")
        .with_field("minttl", "86400")
}

pub fn ns(origin: &str) -> ResourceRecord {
    ResourceRecord::new("@", RecordType::NS, 3600).with_field("ns", format!("ns1.{}.", origin))
}

pub fn a_record(name: &str, address: &str, ttl: u32) -> ResourceRecord {
    ResourceRecord::new(name, RecordType::A, ttl).with_field("address", address)
}

pub fn aaaa_record(name: &str, address: &str, ttl: u32) -> ResourceRecord {
    ResourceRecord::new(name, RecordType::AAAA, ttl).with_field("address", address)
}

/// SOA, NS and the given records
pub fn basic_zone(origin: &str, records: Vec<ResourceRecord>) -> Zone {
    let mut all = vec![soa(origin), ns(origin)];
    all.extend(records);
    Zone::new(origin, Some(3600), all)
}
