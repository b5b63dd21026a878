//! USB HID boot-protocol keyboard firmware for the ATmega32U4.
//!
//! The protocol logic (descriptor emission, control endpoint state
//! machine, idle engine, send path, lifecycle) is written against the
//! [`bus::EndpointBus`] trait, so it runs both on real hardware
//! ([`avr_bus::RegisterBus`]) and, under `cargo test`, against
//! [`mock_bus::MockBus`] on the host. `#![no_std]` only applies to the
//! non-test build; the test harness needs `std` for the test runner.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

pub mod avr_bus;
pub mod bus;
pub mod control;
pub mod descriptors;
pub mod emitter;
pub mod error;
pub mod idle;
#[cfg(target_arch = "avr")]
pub mod isr;
pub mod keyboard;
pub mod lifecycle;
pub mod state;

#[cfg(test)]
mod mock_bus;

pub use bus::EndpointBus;
pub use descriptors::UsbConfig;
pub use error::UsbError;
pub use keyboard::Keyboard;
pub use state::{DeviceState, KeyboardReport, Protocol};
