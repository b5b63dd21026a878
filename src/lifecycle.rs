//! Lifecycle & End-Of-Reset (spec §4.6).
//!
//! `usb_init` is almost entirely register sequencing (PLL lock, pad
//! regulator, attach) and lives in [`crate::avr_bus::RegisterBus::attach`]
//! since it has no meaningful host-testable behaviour beyond "device state
//! becomes Disconnected". The End-Of-Reset handler, by contrast, is pure
//! endpoint reconfiguration plus a state transition, so it is expressed
//! here against [`EndpointBus`] and is fully testable with
//! [`crate::mock_bus::MockBus`]. Grounded on `original_source/usb.c`'s
//! `usb_init` and the `EORSTI` branch of `ISR(USB_GEN_vect)`.

use crate::bus::EndpointBus;
use crate::descriptors::CONTROL_ENDPOINT;
use crate::error::UsbError;
use crate::state::DeviceAggregate;

/// (Re)configure the control endpoint and drop device state back to
/// `Disconnected`. Called once per End-Of-Reset interrupt, and once at
/// the end of `usb_init`'s power-up sequence.
pub fn on_end_of_reset<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    agg.on_bus_reset();

    bus.select(CONTROL_ENDPOINT);
    bus.configure_control_endpoint();

    if !bus.endpoint_config_ok() {
        return Err(UsbError::EndpointConfigFailure);
    }

    Ok(())
}
