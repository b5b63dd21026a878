//! Periodic Report Engine (spec §4.4).
//!
//! Runs once per Start-Of-Frame, but only while the device is `Attached`.
//! Grounded on `original_source/usb.c`'s `ISR(USB_GEN_vect)` SOFI branch:
//! the free-running `sof_prescaler` counter, the `& 3 == 0` prescale-by-4
//! gate, and the RW-Allowed-gated refresh write are all carried over as-is.

use crate::bus::EndpointBus;
use crate::descriptors::KEYBOARD_ENDPOINT_NUM;
use crate::state::{DeviceAggregate, DeviceState};

/// Called once per SOF interrupt. No-op unless the device is `Attached`.
pub fn on_start_of_frame<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) {
    if agg.device_state != DeviceState::Attached {
        return;
    }

    agg.sof_prescaler = agg.sof_prescaler.wrapping_add(1);
    if agg.idle_value == 0 || agg.sof_prescaler & 0b11 != 0 {
        return;
    }

    bus.select(KEYBOARD_ENDPOINT_NUM);
    if !bus.bank_writable() {
        return;
    }

    agg.current_idle += 1;
    if agg.current_idle != agg.idle_value {
        return;
    }

    agg.current_idle = 0;
    for byte in agg.report.to_bytes() {
        bus.push(byte);
    }
    bus.release_in_bank();
}
