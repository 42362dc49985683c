//! TOML persistence of the calibration range and configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reptrack::EngineState;
use tracing::{debug, info};

use crate::error::Result;

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields the defaults.
    pub fn load(&self) -> Result<EngineState> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved state, using defaults");
                return Ok(EngineState::default());
            }
            Err(e) => return Err(e.into()),
        };
        let state = toml::from_str(&text)?;
        info!(path = %self.path.display(), "restored saved state");
        Ok(state)
    }

    /// Write through a sibling temp file so a crash never leaves a torn file.
    pub fn save(&self, state: &EngineState) -> Result<()> {
        let text = toml::to_string(state)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}
