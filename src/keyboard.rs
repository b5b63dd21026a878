//! Host-Facing Send Path (spec §4.5) and the top-level `Keyboard` facade.
//!
//! `submit_report` is the one primitive an input collaborator calls: it
//! snapshots the current modifier/pressed-key state into the IN endpoint
//! and marks the bank ready. `tap_key` is the one-shot convenience carried
//! over from `original_source/usb.c`'s `send_keypress`.

use crate::bus::EndpointBus;
use crate::control;
use crate::descriptors::{DescriptorSet, UsbConfig, KEYBOARD_ENDPOINT_NUM};
use crate::error::UsbError;
use crate::idle;
use crate::lifecycle;
use crate::state::{DeviceAggregate, DeviceState, KeyboardReport};

/// Write the current report into the keyboard IN endpoint and mark it
/// ready for the host to poll. Fails if the device has not been
/// configured yet (spec §4.5: "Returns failure if device state is not
/// Attached").
pub fn submit_report<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    if agg.device_state != DeviceState::Attached {
        return Err(UsbError::NotAttached);
    }

    bus.select(KEYBOARD_ENDPOINT_NUM);
    bus.await_bank_writable();
    for byte in agg.report.to_bytes() {
        bus.push(byte);
    }
    bus.release_in_bank();
    agg.current_idle = 0;
    Ok(())
}

/// Press-then-release a single key in slot 0, as two `submit_report`s back
/// to back. Grounded on `usb.c`'s `send_keypress`.
pub fn tap_key<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    key: u8,
    modifier: u8,
) -> Result<(), UsbError> {
    agg.report.keys[0] = key;
    agg.report.modifier = modifier;
    submit_report(bus, agg)?;

    agg.report.keys[0] = 0;
    agg.report.modifier = 0;
    submit_report(bus, agg)
}

/// Bundles the endpoint bus, device-state aggregate and descriptor set
/// that make up one USB keyboard device, and exposes the operations an
/// input collaborator and the interrupt vectors need.
pub struct Keyboard<B: EndpointBus> {
    bus: B,
    agg: DeviceAggregate,
    descriptors: DescriptorSet,
}

impl<B: EndpointBus> Keyboard<B> {
    pub fn new(bus: B, config: UsbConfig) -> Self {
        Self {
            bus,
            agg: DeviceAggregate::new(config.idle_default),
            descriptors: DescriptorSet::build(&config),
        }
    }

    pub fn device_state(&self) -> DeviceState {
        self.agg.device_state
    }

    /// Force device state back to `Disconnected` without touching the
    /// endpoint hardware, used once at the end of the power-up sequence
    /// (spec §4.6: `usb_init` sets this directly, ahead of the first
    /// End-Of-Reset interrupt).
    pub fn mark_disconnected(&mut self) {
        self.agg.on_bus_reset();
    }

    /// Replace the 6-slot pressed-key buffer. Does not submit; call
    /// `submit_report` afterwards to push it to the host.
    pub fn set_pressed_keys(&mut self, keys: [u8; 6]) {
        self.agg.report.keys = keys;
    }

    pub fn set_modifier(&mut self, modifier: u8) {
        self.agg.report.modifier = modifier;
    }

    pub fn report(&self) -> KeyboardReport {
        self.agg.report
    }

    pub fn submit_report(&mut self) -> Result<(), UsbError> {
        submit_report(&mut self.bus, &mut self.agg)
    }

    pub fn tap_key(&mut self, key: u8, modifier: u8) -> Result<(), UsbError> {
        tap_key(&mut self.bus, &mut self.agg, key, modifier)
    }

    /// Drive the control endpoint once; a no-op if no SETUP is pending.
    pub fn handle_setup(&mut self) -> Result<(), UsbError> {
        control::handle_setup(&mut self.bus, &mut self.agg, &self.descriptors)
    }

    /// Drive the periodic idle refresh once per Start-Of-Frame.
    pub fn on_start_of_frame(&mut self) {
        idle::on_start_of_frame(&mut self.bus, &mut self.agg)
    }

    /// Drive End-Of-Reset handling.
    pub fn on_end_of_reset(&mut self) -> Result<(), UsbError> {
        lifecycle::on_end_of_reset(&mut self.bus, &mut self.agg)
    }

    /// Escape hatch for the real interrupt vectors (`isr.rs`), which need
    /// to consult hardware-specific flags (`RegisterBus::take_end_of_reset`
    /// / `take_start_of_frame`) that aren't part of the portable
    /// [`EndpointBus`] contract before deciding which handler to run.
    pub fn bus_and_state(&mut self) -> (&mut B, &mut DeviceAggregate) {
        (&mut self.bus, &mut self.agg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_bus::MockBus;

    fn attached() -> (MockBus, DeviceAggregate) {
        let mut agg = DeviceAggregate::new(125);
        agg.device_state = DeviceState::Attached;
        (MockBus::new(), agg)
    }

    #[test]
    fn submit_report_fails_before_attach() {
        let mut bus = MockBus::new();
        let mut agg = DeviceAggregate::new(125);
        assert_eq!(submit_report(&mut bus, &mut agg), Err(UsbError::NotAttached));
        assert!(bus.sent_bytes().is_empty());
    }

    #[test]
    fn submit_report_sends_the_current_snapshot_and_resets_idle() {
        let (mut bus, mut agg) = attached();
        agg.current_idle = 42;
        agg.report = KeyboardReport {
            modifier: 0x02,
            keys: [4, 0, 0, 0, 0, 0],
        };
        submit_report(&mut bus, &mut agg).unwrap();
        assert_eq!(bus.sent_bytes(), &[0x02, 0x00, 4, 0, 0, 0, 0, 0]);
        assert_eq!(agg.current_idle, 0);
    }

    #[test]
    fn tap_key_sends_press_then_release() {
        let (mut bus, mut agg) = attached();
        tap_key(&mut bus, &mut agg, 0x04, 0x02).unwrap();
        assert_eq!(bus.bank_releases(), 2);
        assert_eq!(
            bus.sent_bytes(),
            &[0x02, 0x00, 0x04, 0, 0, 0, 0, 0, 0x00, 0x00, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(agg.report.keys[0], 0);
        assert_eq!(agg.report.modifier, 0);
    }

    #[test]
    fn keyboard_facade_reports_unknown_state_before_any_reset() {
        let bus = MockBus::new();
        let keyboard = Keyboard::new(bus, UsbConfig::default_config());
        assert_eq!(keyboard.device_state(), DeviceState::Unknown);
    }

    #[test]
    fn mark_disconnected_moves_out_of_unknown() {
        let bus = MockBus::new();
        let mut keyboard = Keyboard::new(bus, UsbConfig::default_config());
        keyboard.mark_disconnected();
        assert_eq!(keyboard.device_state(), DeviceState::Disconnected);
    }

    #[test]
    fn keyboard_facade_set_pressed_keys_reflects_in_report() {
        let bus = MockBus::new();
        let mut keyboard = Keyboard::new(bus, UsbConfig::default_config());
        keyboard.set_pressed_keys([1, 2, 3, 4, 5, 6]);
        keyboard.set_modifier(0x01);
        assert_eq!(keyboard.report().keys, [1, 2, 3, 4, 5, 6]);
        assert_eq!(keyboard.report().modifier, 0x01);
    }
}
