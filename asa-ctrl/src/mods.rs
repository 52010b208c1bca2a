//! The mod database, a JSON list of mod records kept in the server files.
//!
//! The server's start script reads it to build the `-mods=` start parameter.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = "/home/gameserver/server-files/mods.json";

/// Where `mods --params` leaves the reason it could not read the database.
pub const MOD_READ_ERROR_PATH: &str = "/tmp/mod-read-error";

const UNKNOWN_MOD_NAME: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum ModsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} is corrupted: {source}", .path.display())]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize the mod database")]
    Serialize(#[source] serde_json::Error),

    #[error("mod {0} is already enabled")]
    AlreadyEnabled(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    pub mod_id: u64,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub scanned: bool,
}

fn unknown_name() -> String {
    UNKNOWN_MOD_NAME.to_string()
}

#[derive(Debug)]
pub struct ModDatabase {
    path: PathBuf,
    records: Vec<ModRecord>,
}

impl ModDatabase {
    /// Opens the database at `path`, creating an empty one if the file is missing or empty.
    ///
    /// A file that cannot be parsed is left alone so its contents can be rescued.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ModsError> {
        let path = path.into();

        if let Some(records) = read_records(&path)? {
            return Ok(ModDatabase { path, records });
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let database = ModDatabase {
            path,
            records: Vec::new(),
        };
        database.write()?;

        Ok(database)
    }

    /// Opens the database without creating it. Returns `None` if there is nothing to read.
    pub fn load_existing(path: impl Into<PathBuf>) -> Result<Option<Self>, ModsError> {
        let path = path.into();
        Ok(read_records(&path)?.map(|records| ModDatabase { path, records }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ModRecord] {
        &self.records
    }

    pub fn lookup(&self, mod_id: u64) -> Option<&ModRecord> {
        self.records.iter().find(|record| record.mod_id == mod_id)
    }

    /// Enables a mod, adding a record for it if it is not known yet.
    pub fn enable(&mut self, mod_id: u64) -> Result<(), ModsError> {
        if let Some(record) = self.records.iter_mut().find(|record| record.mod_id == mod_id) {
            if record.enabled {
                return Err(ModsError::AlreadyEnabled(mod_id));
            }

            record.enabled = true;
            return self.write();
        }

        self.add(mod_id, UNKNOWN_MOD_NAME, true, false)
    }

    pub fn add(
        &mut self,
        mod_id: u64,
        name: &str,
        enabled: bool,
        scanned: bool,
    ) -> Result<(), ModsError> {
        self.records.push(ModRecord {
            mod_id,
            name: name.to_string(),
            enabled,
            scanned,
        });

        self.write()
    }

    pub fn enabled_ids(&self) -> Vec<u64> {
        self.records
            .iter()
            .filter(|record| record.enabled)
            .map(|record| record.mod_id)
            .collect()
    }

    /// Builds the `-mods=` start parameter, or `None` if no mod is enabled.
    pub fn start_param(&self) -> Option<String> {
        let ids = self.enabled_ids();
        if ids.is_empty() {
            return None;
        }

        let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
        Some(format!("-mods={}", ids.join(",")))
    }

    fn write(&self) -> Result<(), ModsError> {
        let json = serde_json::to_string_pretty(&self.records).map_err(ModsError::Serialize)?;
        fs::write(&self.path, json)?;

        log::debug!("Wrote {} mod records to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

fn read_records(path: &Path) -> Result<Option<Vec<ModRecord>>, ModsError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    if contents.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ModsError::Corrupted {
            path: path.to_path_buf(),
            source,
        })
}
