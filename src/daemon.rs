//! One step of the host loop: apply an input or a tick to the engine,
//! persist state when it changes and emit output lines.

use std::sync::mpsc;
use std::time::Duration;

use reptrack::{ConfigEvent, Engine, EngineOutput};
use tracing::{info, warn};

use crate::error::Result;
use crate::sensor::{Command, Input};
use crate::state::StateFile;

/// Where output JSON lines go.
pub trait Sink {
    fn emit(&mut self, line: &str);
}

pub struct Daemon<S> {
    engine: Engine,
    config_events: mpsc::Receiver<ConfigEvent>,
    state_file: Option<StateFile>,
    sink: S,
    last_output: Option<EngineOutput>,
}

impl<S: Sink> Daemon<S> {
    pub fn new(mut engine: Engine, state_file: Option<StateFile>, sink: S) -> Self {
        let config_events = engine.subscribe();
        Self {
            engine,
            config_events,
            state_file,
            sink,
            last_output: None,
        }
    }

    /// Apply one input. A failing command is logged; it never stops the loop.
    pub fn handle(&mut self, input: Input, now: Duration) {
        match input {
            Input::Sample(raw) => self.engine.on_sample(raw.as_str(), now),
            Input::Command(command) => {
                if let Err(e) = self.apply(command) {
                    warn!("command failed: {e}");
                }
            }
        }

        while let Ok(event) = self.config_events.try_recv() {
            info!(?event, config = ?self.engine.config(), "configuration changed");
            self.save();
        }
    }

    /// Advance the engine and emit the output if it differs from the last one.
    pub fn tick(&mut self, now: Duration) -> Result<()> {
        self.engine.tick(now);
        let output = self.engine.output();
        if self.last_output != Some(output) {
            self.emit(&output)?;
            self.last_output = Some(output);
        }
        Ok(())
    }

    pub fn shutdown(&mut self) {
        info!(repetitions = self.engine.repetitions(), "sensor feed closed, shutting down");
        self.save();
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::StartCalibration => self.engine.start_calibration(),
            Command::StopCalibration => {
                self.engine.stop_calibration();
                self.save();
            }
            Command::Set(param, value) => self.engine.set_parameter(param, value)?,
            Command::Reset => self.engine.reset_config(),
            Command::Status => {
                let output = self.engine.output();
                self.emit(&output)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, output: &EngineOutput) -> Result<()> {
        let json = serde_json::to_string(output)?;
        self.sink.emit(&json);
        Ok(())
    }

    fn save(&self) {
        let Some(file) = &self.state_file else {
            return;
        };
        if let Err(e) = file.save(&self.engine.state()) {
            warn!(path = %file.path().display(), "failed to save state: {e}");
        }
    }
}
