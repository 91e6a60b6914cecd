//! The emulated testboard session.
//!
//! [`Testboard`] exposes the RPC surface the host library drives. DAQ,
//! trigger, and chip-selection calls have real semantics; hardware-only
//! calls (power, clocks, signal levels) are emulated no-ops that log with
//! `noop = true` and bump [`DiagCounters::noop_calls`].

use tracing::{debug, error, warn};

use crate::api::{DaqRead, EmulatorConfig, TbmType};
use crate::chips::ChipAddressSet;
use crate::config::{RocConfig, TbmConfig};
use crate::daq::DaqChannelStore;
use crate::decoder::{DecodedStream, EventDecoder};
use crate::diag::DiagCounters;
use crate::framing::Framing;
use crate::trigger::{distribute_triggers, run_sweep, Distribution, SweepSpec};
use crate::FaultCode;

/// Board id reported by the emulator.
pub const EMULATOR_BOARD_ID: u16 = 0x0000;
/// Firmware version reported by the emulator.
pub const EMULATOR_FW_VERSION: u16 = 0x0000;
/// Software version reported by the emulator.
pub const EMULATOR_SW_VERSION: u16 = 0x0000;
/// Upgrade protocol version reported by the emulator.
pub const EMULATOR_UPGRADE_VERSION: u16 = 0x0100;
/// Hardware revision string reported by the emulator.
pub const EMULATOR_HW_VERSION: &str = "Hardware Revision 0";

/// Supply settings as last written by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PowerSettings {
    /// Digital supply voltage, mV.
    pub vd: u16,
    /// Analog supply voltage, mV.
    pub va: u16,
    /// Digital current limit, 100 uA units.
    pub id: u16,
    /// Analog current limit, 100 uA units.
    pub ia: u16,
}

/// One emulated DTB session.
#[derive(Debug, Clone)]
pub struct Testboard {
    config: EmulatorConfig,
    store: DaqChannelStore,
    chips: ChipAddressSet,
    tbm: TbmType,
    power: PowerSettings,
    powered: bool,
    hv_on: bool,
    loop_chip_count: usize,
    diag: DiagCounters,
}

impl Default for Testboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Testboard {
    /// Creates a session with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    /// Creates a session from an explicit configuration.
    #[must_use]
    pub fn with_config(config: EmulatorConfig) -> Self {
        debug!(
            daq_channels = config.daq_channels,
            tbm = ?config.initial_tbm,
            "testboard created"
        );
        Self {
            store: DaqChannelStore::new(config.daq_channels),
            chips: ChipAddressSet::new(),
            tbm: config.initial_tbm,
            power: PowerSettings::default(),
            powered: false,
            hv_on: false,
            loop_chip_count: 0,
            diag: DiagCounters::new(),
            config,
        }
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Current TBM type.
    #[must_use]
    pub const fn tbm_type(&self) -> TbmType {
        self.tbm
    }

    /// Chip addresses registered so far, first-seen order.
    #[must_use]
    pub const fn chips(&self) -> &ChipAddressSet {
        &self.chips
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn diag(&self) -> &DiagCounters {
        &self.diag
    }

    /// Read-only view of the DAQ channels.
    #[must_use]
    pub const fn daq_channels(&self) -> &DaqChannelStore {
        &self.store
    }

    fn noop(&mut self, rpc: &'static str) {
        debug!(rpc, noop = true, "called");
        self.diag.record_noop();
    }

    fn track<T>(
        &mut self,
        rpc: &'static str,
        result: Result<T, FaultCode>,
    ) -> Result<T, FaultCode> {
        if let Err(code) = &result {
            self.diag.record_fault(*code);
            if code.is_fatal() {
                error!(rpc, fault = %code, code = code.as_u8(), "fatal fault");
            } else {
                warn!(rpc, fault = %code, code = code.as_u8(), "call failed");
            }
        }
        result
    }

    fn record(&mut self, distribution: &Distribution) {
        let triggers = u32::try_from(distribution.triggers).unwrap_or(u32::MAX);
        self.diag
            .record_synthesis(triggers, distribution.events, distribution.words);
    }

    // Board identification.

    /// Free-form board description.
    #[must_use]
    pub fn info(&mut self) -> String {
        self.noop("info");
        format!(
            " DTB Emulator \n {} {}\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Board id.
    pub fn board_id(&mut self) -> u16 {
        self.noop("board_id");
        EMULATOR_BOARD_ID
    }

    /// Hardware revision.
    pub fn hw_version(&mut self) -> &'static str {
        self.noop("hw_version");
        EMULATOR_HW_VERSION
    }

    /// Firmware version.
    pub fn fw_version(&mut self) -> u16 {
        self.noop("fw_version");
        EMULATOR_FW_VERSION
    }

    /// Software version.
    pub fn sw_version(&mut self) -> u16 {
        self.noop("sw_version");
        EMULATOR_SW_VERSION
    }

    /// Upgrade protocol version.
    pub fn upgrade_version(&mut self) -> u16 {
        self.noop("upgrade_version");
        EMULATOR_UPGRADE_VERSION
    }

    // Power.

    /// Switches the chip supplies on.
    pub fn pon(&mut self) {
        self.noop("pon");
        self.powered = true;
    }

    /// Switches the chip supplies off.
    pub fn poff(&mut self) {
        self.noop("poff");
        self.powered = false;
    }

    /// Returns true between [`Testboard::pon`] and [`Testboard::poff`].
    #[must_use]
    pub const fn is_powered(&self) -> bool {
        self.powered
    }

    /// Switches the sensor bias on.
    pub fn hv_on(&mut self) {
        self.noop("hv_on");
        self.hv_on = true;
    }

    /// Switches the sensor bias off.
    pub fn hv_off(&mut self) {
        self.noop("hv_off");
        self.hv_on = false;
    }

    /// Returns true while the sensor bias is on.
    #[must_use]
    pub const fn is_hv_on(&self) -> bool {
        self.hv_on
    }

    /// Sets the digital supply voltage.
    pub fn set_vd(&mut self, millivolts: u16) {
        self.noop("set_vd");
        self.power.vd = millivolts;
    }

    /// Sets the analog supply voltage.
    pub fn set_va(&mut self, millivolts: u16) {
        self.noop("set_va");
        self.power.va = millivolts;
    }

    /// Sets the digital current limit.
    pub fn set_id(&mut self, current: u16) {
        self.noop("set_id");
        self.power.id = current;
    }

    /// Sets the analog current limit.
    pub fn set_ia(&mut self, current: u16) {
        self.noop("set_ia");
        self.power.ia = current;
    }

    /// Digital supply voltage as last set.
    pub fn vd(&mut self) -> u16 {
        self.noop("get_vd");
        self.power.vd
    }

    /// Analog supply voltage as last set.
    pub fn va(&mut self) -> u16 {
        self.noop("get_va");
        self.power.va
    }

    /// Digital current as last set.
    pub fn id(&mut self) -> u16 {
        self.noop("get_id");
        self.power.id
    }

    /// Analog current as last set.
    pub fn ia(&mut self) -> u16 {
        self.noop("get_ia");
        self.power.ia
    }

    /// All supply settings.
    #[must_use]
    pub const fn power(&self) -> PowerSettings {
        self.power
    }

    // Clocks and signals.

    /// Selects the clock source.
    pub fn set_clock_source(&mut self, _source: u8) {
        self.noop("set_clock_source");
    }

    /// Sets the clock frequency divider.
    pub fn set_clock(&mut self, _divider: u8) {
        self.noop("set_clock");
    }

    /// Clock presence check; the emulated clock is always present.
    pub fn is_clock_present(&mut self) -> bool {
        self.noop("is_clock_present");
        true
    }

    /// Configures clock stretching.
    pub fn set_clock_stretch(&mut self, _source: u8, _delay: u16, _width: u16) {
        self.noop("set_clock_stretch");
    }

    /// Sets a signal's output mode.
    pub fn sig_set_mode(&mut self, _signal: u8, _mode: u8) {
        self.noop("sig_set_mode");
    }

    /// Sets a signal's delay.
    pub fn sig_set_delay(&mut self, _signal: u8, _delay: u16, _duty: i8) {
        self.noop("sig_set_delay");
    }

    /// Sets a signal's output level.
    pub fn sig_set_level(&mut self, _signal: u8, _level: u8) {
        self.noop("sig_set_level");
    }

    // DAQ.

    /// Selects the 160 Mbps deserializer for the given phase.
    pub fn daq_select_deser160(&mut self, _phase: u8) {
        self.noop("daq_select_deser160");
    }

    /// Selects the 400 Mbps deserializer.
    pub fn daq_select_deser400(&mut self) {
        self.noop("daq_select_deser400");
    }

    /// Reserves `buffer_bytes / 2` words on `channel`.
    ///
    /// Returns the reserved capacity in words, or 0 if `channel` does not exist.
    pub fn daq_open(&mut self, channel: u8, buffer_bytes: u32) -> u32 {
        debug!(rpc = "daq_open", channel, buffer_bytes, "called");
        self.store.open(channel, buffer_bytes)
    }

    /// Empties and deactivates `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn daq_close(&mut self, channel: u8) -> Result<(), FaultCode> {
        debug!(rpc = "daq_close", channel, "called");
        let result = self.store.close(channel);
        self.track("daq_close", result)
    }

    /// Activates `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn daq_start(&mut self, channel: u8) -> Result<(), FaultCode> {
        debug!(rpc = "daq_start", channel, "called");
        let result = self.store.start(channel);
        self.track("daq_start", result)
    }

    /// Deactivates `channel`, keeping its data.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn daq_stop(&mut self, channel: u8) -> Result<(), FaultCode> {
        debug!(rpc = "daq_stop", channel, "called");
        let result = self.store.stop(channel);
        self.track("daq_stop", result)
    }

    /// Queued words on an active channel, 0 otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn daq_get_size(&mut self, channel: u8) -> Result<u32, FaultCode> {
        debug!(rpc = "daq_get_size", channel, "called");
        let result = self.store.size(channel);
        self.track("daq_get_size", result)
    }

    /// Drains up to `max_bytes / 2` words from `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn daq_read(&mut self, channel: u8, max_bytes: u32) -> Result<DaqRead, FaultCode> {
        debug!(rpc = "daq_read", channel, max_bytes, "called");
        let result = self.store.read(channel, max_bytes);
        let read = self.track("daq_read", result)?;
        self.diag.record_drain(read.words.len());
        Ok(read)
    }

    /// Buffer fill level in percent. Constant.
    pub fn daq_fill_level(&mut self) -> u8 {
        debug!(rpc = "daq_fill_level", "called");
        self.config.fill_level_percent
    }

    // Triggers and loops.

    /// Selects the trigger source; TBM emulator sources switch the TBM type.
    pub fn trigger_select(&mut self, source: u16) {
        let tbm = self.tbm.after_trigger_select(source);
        debug!(rpc = "trigger_select", source, from = ?self.tbm, to = ?tbm, "called");
        self.tbm = tbm;
    }

    /// Enables a physical TBM (`Basic`) or disables TBM framing (`None`).
    pub fn tbm_enable(&mut self, enable: bool) {
        self.tbm = if enable { TbmType::Basic } else { TbmType::None };
        debug!(rpc = "tbm_enable", enable, tbm = ?self.tbm, "called");
    }

    /// Writes a TBM register.
    pub fn tbm_set(&mut self, _register: u8, _value: u8) {
        self.noop("tbm_set");
    }

    /// Registers a chip address.
    pub fn roc_i2c_addr(&mut self, address: u8) {
        let added = self.chips.insert(address);
        debug!(rpc = "roc_i2c_addr", address, added, "called");
    }

    /// Writes a DAC register on the selected chip.
    pub fn roc_set_dac(&mut self, _register: u8, _value: u8) {
        self.noop("roc_set_dac");
    }

    /// Clears all calibrate flags on the selected chip.
    pub fn roc_clr_cal(&mut self) {
        self.noop("roc_clr_cal");
    }

    /// Masks every pixel of the selected chip.
    pub fn roc_chip_mask(&mut self) {
        self.noop("roc_chip_mask");
    }

    /// Stores the chip list used by board-side loops.
    pub fn set_i2c_addresses(&mut self, addresses: &[u8]) -> bool {
        self.noop("set_i2c_addresses");
        self.loop_chip_count = addresses.len();
        true
    }

    /// Chip count of the last [`Testboard::set_i2c_addresses`] call.
    #[must_use]
    pub const fn loop_chip_count(&self) -> usize {
        self.loop_chip_count
    }

    /// Resets the loop interrupt state.
    pub fn loop_interrupt_reset(&mut self) {
        self.noop("loop_interrupt_reset");
    }

    /// Programs chips and returns how many were registered.
    ///
    /// Enabled chips register their I2C address; DAC and pixel settings have
    /// no effect on synthesised data.
    pub fn program_rocs(&mut self, rocs: &[RocConfig]) -> usize {
        let mut registered = 0;
        for roc in rocs.iter().filter(|roc| roc.enable) {
            self.roc_i2c_addr(roc.i2c_address);
            for (&register, &value) in &roc.dacs {
                self.roc_set_dac(register, value);
            }
            registered += 1;
        }
        debug!(
            rpc = "program_rocs",
            requested = rocs.len(),
            registered,
            "called"
        );
        registered
    }

    /// Programs a TBM. Returns false for a disabled TBM.
    pub fn program_tbm(&mut self, tbm: &TbmConfig) -> bool {
        if !tbm.enable {
            return false;
        }
        for (&register, &value) in &tbm.dacs {
            self.tbm_set(register, value);
        }
        self.tbm_enable(true);
        true
    }

    /// Sends `triggers` triggers; each active channel receives one event per
    /// trigger.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active.
    pub fn pg_triggers(&mut self, triggers: u32, period: u16) -> Result<Distribution, FaultCode> {
        debug!(rpc = "pg_triggers", triggers, period, "called");
        let result = distribute_triggers(&mut self.store, self.chips.len(), self.tbm, triggers);
        let distribution = self.track("pg_triggers", result)?;
        self.record(&distribution);
        Ok(distribution)
    }

    /// Calibrates every pixel of `chips`, `triggers` times each.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active.
    pub fn loop_multi_roc_all_pixels_calibrate(
        &mut self,
        chips: &[u8],
        triggers: u16,
        flags: u16,
    ) -> Result<Distribution, FaultCode> {
        self.run_sweep(&SweepSpec::calibrate_all(chips.to_vec(), triggers, flags))
    }

    /// Runs a calibration or DAC scan sweep.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active and
    /// [`FaultCode::InvalidSweep`] for a malformed range.
    pub fn run_sweep(&mut self, spec: &SweepSpec) -> Result<Distribution, FaultCode> {
        debug!(
            rpc = "run_sweep",
            chips = spec.scope.addresses().len(),
            extent = ?spec.extent,
            dacs = ?spec.dacs,
            triggers = spec.triggers,
            flags = spec.flags,
            "called"
        );
        let result = run_sweep(
            &mut self.store,
            spec,
            self.tbm,
            self.config.calibrate_pulse_height,
        );
        let distribution = self.track("run_sweep", result)?;
        self.record(&distribution);
        Ok(distribution)
    }

    // Host-side decoding.

    /// Decoder matching the session's current framing.
    #[must_use]
    pub fn event_decoder(&self) -> EventDecoder {
        EventDecoder::new(Framing::from(self.tbm))
    }

    /// Splits and decodes drained words with the session's framing.
    ///
    /// # Errors
    ///
    /// Propagates decoder faults.
    pub fn decode_events(&mut self, words: &[u16]) -> Result<DecodedStream, FaultCode> {
        let result = self
            .event_decoder()
            .decode_stream(words, self.config.max_frame_words);
        self.track("decode_events", result)
    }
}
