//! Real ATmega32U4 interrupt vector wiring. Only compiled for the `avr`
//! target (gated in `lib.rs`). Two hardware interrupt sources share the
//! single [`Keyboard`] instance (spec §5): `USB_GEN_vect` carries End-Of-
//! Reset and Start-Of-Frame, `USB_COM_vect` carries SETUP arrival. Both
//! reach the shared state through the same `avr_device::interrupt::Mutex`
//! pattern the `avr-device` crate documents for cross-ISR statics.

use core::cell::RefCell;

use avr_device::interrupt::Mutex;

use crate::avr_bus::RegisterBus;
use crate::descriptors::UsbConfig;
use crate::idle;
use crate::keyboard::Keyboard;
use crate::lifecycle;

pub static KEYBOARD: Mutex<RefCell<Option<Keyboard<RegisterBus>>>> =
    Mutex::new(RefCell::new(None));

/// Install the shared keyboard instance. Call once from `main`, before
/// interrupts are globally enabled.
pub fn install(usb: avr_device::atmega32u4::USB_DEVICE, config: UsbConfig) {
    let bus = RegisterBus::new(usb);
    avr_device::interrupt::free(|cs| {
        *KEYBOARD.borrow(cs).borrow_mut() = Some(Keyboard::new(bus, config));
    });
}

fn on_general_interrupt(keyboard: &mut Keyboard<RegisterBus>) {
    let (bus, agg) = keyboard.bus_and_state();
    if bus.take_end_of_reset() {
        let _ = lifecycle::on_end_of_reset(bus, agg);
    }
    if bus.take_start_of_frame() {
        idle::on_start_of_frame(bus, agg);
    }
}

#[avr_device::interrupt(atmega32u4)]
fn USB_GEN() {
    avr_device::interrupt::free(|cs| {
        let mut slot = KEYBOARD.borrow(cs).borrow_mut();
        if let Some(keyboard) = slot.as_mut() {
            on_general_interrupt(keyboard);
        }
    });
}

#[avr_device::interrupt(atmega32u4)]
fn USB_COM() {
    avr_device::interrupt::free(|cs| {
        let mut slot = KEYBOARD.borrow(cs).borrow_mut();
        if let Some(keyboard) = slot.as_mut() {
            let _ = keyboard.handle_setup();
        }
    });
}
