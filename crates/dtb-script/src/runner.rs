//! Executes parsed scripts against an emulated testboard.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dtb_emulator::{complete_frames_len, format_event, DiagCounters, Event, FaultCode, Testboard};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::errors::{ScriptError, ScriptErrorKind, SourceLoc};
use crate::parser::{parse_script, Command, ScriptLine};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Commands executed.
    pub commands: usize,
    /// Events decoded per channel, over all reads.
    pub events_per_channel: BTreeMap<u8, usize>,
    /// Frames that carried framing-error flags.
    pub flagged_frames: usize,
    /// Board counters at the end of the run.
    pub diag: DiagCounters,
}

impl RunReport {
    /// Machine-readable form of the report.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let channels: BTreeMap<String, usize> = self
            .events_per_channel
            .iter()
            .map(|(channel, count)| (channel.to_string(), *count))
            .collect();
        json!({
            "commands": self.commands,
            "events_per_channel": channels,
            "flagged_frames": self.flagged_frames,
            "diag": serde_json::to_value(self.diag).unwrap_or_default(),
        })
    }

    /// Human-readable form of the report, one fact per line.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("{} commands", self.commands)];
        lines.extend(
            self.events_per_channel
                .iter()
                .map(|(channel, count)| format!("channel {channel}: {count} events")),
        );
        lines.push(format!(
            "{} words synthesised, {} drained, {} faults",
            self.diag.words_synthesised,
            self.diag.words_drained,
            self.diag.fault_total()
        ));
        lines.join("\n")
    }
}

/// Runs script commands one at a time and keeps what reads decoded.
///
/// A read whose byte budget ends inside a frame keeps the unfinished words per
/// channel and decodes them together with the next read.
#[derive(Debug)]
pub struct ScriptRunner {
    board: Testboard,
    file: PathBuf,
    events: BTreeMap<u8, Vec<Event>>,
    partial: BTreeMap<u8, Vec<u16>>,
    flagged_frames: usize,
    commands: usize,
}

impl ScriptRunner {
    /// Creates a runner over a fresh board.
    #[must_use]
    pub fn new(file: PathBuf) -> Self {
        Self::with_board(Testboard::new(), file)
    }

    /// Creates a runner over an existing board.
    #[must_use]
    pub const fn with_board(board: Testboard, file: PathBuf) -> Self {
        Self {
            board,
            file,
            events: BTreeMap::new(),
            partial: BTreeMap::new(),
            flagged_frames: 0,
            commands: 0,
        }
    }

    /// The board under test.
    #[must_use]
    pub const fn board(&self) -> &Testboard {
        &self.board
    }

    /// Events decoded from `channel` so far.
    #[must_use]
    pub fn events(&self, channel: u8) -> &[Event] {
        self.events.get(&channel).map_or(&[], Vec::as_slice)
    }

    /// Words drained from `channel` that do not yet form a complete frame.
    #[must_use]
    pub fn partial_words(&self, channel: u8) -> &[u16] {
        self.partial.get(&channel).map_or(&[], Vec::as_slice)
    }

    /// Runs every line, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first fatal fault or failed expectation, located at its line.
    pub fn run(&mut self, script: &[ScriptLine]) -> Result<(), ScriptError> {
        for line in script {
            self.execute(&line.command)
                .map_err(|e| e.at(SourceLoc::new(self.file.clone(), line.line, 1)))?;
        }
        Ok(())
    }

    /// Runs one command.
    ///
    /// Recoverable faults such as triggering with no open channel are logged
    /// and counted on the board; the run continues.
    ///
    /// # Errors
    ///
    /// Returns fatal faults and failed expectations.
    pub fn execute(&mut self, command: &Command) -> Result<(), ScriptError> {
        self.commands += 1;
        match command {
            Command::DaqOpen { channel, bytes } => {
                let words = self.board.daq_open(*channel, *bytes);
                debug!(channel, words, "opened");
            }
            Command::DaqStart(channel) => self.board.daq_start(*channel)?,
            Command::DaqStop(channel) => self.board.daq_stop(*channel)?,
            Command::DaqClose(channel) => {
                self.board.daq_close(*channel)?;
                self.events.remove(channel);
                self.partial.remove(channel);
            }
            Command::RocI2cAddr(address) => self.board.roc_i2c_addr(*address),
            Command::TbmEnable(enable) => self.board.tbm_enable(*enable),
            Command::TriggerSelect(mask) => self.board.trigger_select(*mask),
            Command::PgTriggers { count, period } => {
                let result = self.board.pg_triggers(*count, *period);
                recoverable(result.map(drop))?;
            }
            Command::Calibrate {
                chips,
                triggers,
                flags,
            } => {
                let result = self
                    .board
                    .loop_multi_roc_all_pixels_calibrate(chips, *triggers, *flags);
                recoverable(result.map(drop))?;
            }
            Command::Sweep(spec) => {
                let result = self.board.run_sweep(spec);
                recoverable(result.map(drop))?;
            }
            Command::Read { channel, bytes } => self.read(*channel, *bytes)?,
            Command::ExpectSize { channel, words } => {
                let actual = self.board.daq_get_size(*channel)?;
                expect(
                    format!("size of channel {channel}"),
                    u64::from(*words),
                    u64::from(actual),
                )?;
            }
            Command::ExpectEvents { channel, count } => {
                let actual = self.events(*channel).len();
                expect(
                    format!("events on channel {channel}"),
                    u64::try_from(*count).unwrap_or(u64::MAX),
                    u64::try_from(actual).unwrap_or(u64::MAX),
                )?;
            }
        }
        Ok(())
    }

    fn read(&mut self, channel: u8, bytes: u32) -> Result<(), ScriptError> {
        let read = self.board.daq_read(channel, bytes)?;
        let drained = read.words.len();

        let mut words = self.partial.remove(&channel).unwrap_or_default();
        words.extend(read.words);
        let complete = complete_frames_len(&words, self.board.event_decoder().framing);
        let tail = words.split_off(complete);

        let stream = self.board.decode_events(&words)?;
        info!(
            channel,
            words = drained,
            events = stream.events.len(),
            carried = tail.len(),
            remaining = read.available,
            "read"
        );
        for event in &stream.events {
            debug!(channel, "{}", format_event(event));
        }
        if !tail.is_empty() {
            self.partial.insert(channel, tail);
        }
        self.flagged_frames += stream.flagged_frames;
        self.events
            .entry(channel)
            .or_default()
            .extend(stream.events);
        Ok(())
    }

    /// Report of everything run so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            commands: self.commands,
            events_per_channel: self
                .events
                .iter()
                .map(|(channel, events)| (*channel, events.len()))
                .collect(),
            flagged_frames: self.flagged_frames,
            diag: *self.board.diag(),
        }
    }
}

fn recoverable(result: Result<(), FaultCode>) -> Result<(), ScriptError> {
    match result {
        Err(code) if code.is_fatal() => Err(code.into()),
        Err(code) => {
            warn!(fault = %code, "continuing");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn expect(what: String, expected: u64, actual: u64) -> Result<(), ScriptError> {
    if expected == actual {
        return Ok(());
    }
    Err(ScriptError::new(ScriptErrorKind::ExpectationFailed {
        what,
        expected,
        actual,
    }))
}

/// Parses and runs a script held in memory. `file` is used for error locations.
///
/// # Errors
///
/// Returns parse errors, fatal faults, and failed expectations.
pub fn run_source(source: &str, file: &Path) -> Result<RunReport, ScriptError> {
    let script = parse_script(source).map_err(|e| {
        let mut error = ScriptError::from(e);
        if let Some(location) = error.location.as_mut() {
            location.file = file.to_path_buf();
        }
        error
    })?;
    let mut runner = ScriptRunner::new(file.to_path_buf());
    runner.run(&script)?;
    Ok(runner.report())
}

/// Reads, parses, and runs a script file.
///
/// # Errors
///
/// Returns I/O errors as well as everything [`run_source`] returns.
pub fn run_file(path: &Path) -> Result<RunReport, ScriptError> {
    let source = fs::read_to_string(path).map_err(|e| {
        ScriptError::new(ScriptErrorKind::Io(format!(
            "failed to read {}: {e}",
            path.display()
        )))
    })?;
    run_source(&source, path)
}
