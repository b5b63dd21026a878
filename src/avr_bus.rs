//! The real [`EndpointBus`](crate::bus::EndpointBus) over the ATmega32U4's
//! USB controller registers. Only compiled for the `avr` target (see the
//! `#[cfg(target_arch = "avr")]` gate on this module in `lib.rs`) since the
//! register block only has a coherent memory layout on real silicon.
//!
//! Register-access idiom (named-field `.modify()`/`.write()` closures via
//! `avr-device`'s generated accessors) is carried over from the teacher's
//! `hid.rs`. Where the teacher never demonstrates a named accessor for a
//! register this firmware also needs (`UESTA0X`, `UERST`), raw `.bits()`
//! access is used instead, grounded on `original_source/usb.c`'s direct
//! register writes to the same two registers.

use avr_device::atmega32u4::{PLL, USB_DEVICE};

use crate::bus::{EndpointBus, EndpointIndex, InterruptInConfig};
use crate::descriptors::KEYBOARD_ENDPOINT_NUM;

pub struct RegisterBus {
    usb: USB_DEVICE,
    /// Mirrors `UENUM` so `release_in_bank` knows whether the dual-bank
    /// keyboard endpoint (FIFOCON applies) or the single-bank control
    /// endpoint (FIFOCON does not exist) is currently selected.
    selected: EndpointIndex,
}

impl RegisterBus {
    pub fn new(usb: USB_DEVICE) -> Self {
        Self { usb, selected: 0 }
    }

    /// Power-up sequence from spec §4.6 / `usb_init`: pad regulator, PLL
    /// lock, controller + OTG pad enable, clock unfreeze, full-speed
    /// attach. Interrupt enable bits and `sei()` are the caller's
    /// responsibility (done once, in the firmware's `main`).
    pub fn attach(&mut self, pll: &PLL) {
        self.usb.uhwcon.write(|w| w.uvrege().set_bit());

        pll.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while pll.pllcsr.read().plock().bit_is_clear() {}

        self.usb
            .usbcon
            .write(|w| w.usbe().set_bit().otgpade().set_bit());
        self.usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        self.usb.udcon.modify(|_, w| w.lsm().clear_bit());
        self.usb.udcon.modify(|_, w| w.detach().clear_bit());

        self.usb
            .udien
            .write(|w| w.eorste().set_bit().sofe().set_bit());
    }

    /// True once per call if an End-Of-Reset interrupt is pending, clearing
    /// the full `UDINT` flag byte (matching `usb.c`'s `UDINT = 0` after
    /// snapshotting it).
    pub fn take_end_of_reset(&mut self) -> bool {
        let udint = self.usb.udint.read();
        let eorsti = udint.eorsti().bit_is_set();
        unsafe {
            self.usb.udint.write(|w| w.bits(0));
        }
        eorsti
    }

    pub fn take_start_of_frame(&mut self) -> bool {
        self.usb.udint.read().sofi().bit_is_set()
    }
}

impl EndpointBus for RegisterBus {
    fn select(&mut self, endpoint: EndpointIndex) {
        self.selected = endpoint & 0x07;
        self.usb.uenum.write(|w| unsafe { w.bits(self.selected) });
    }

    fn await_tx_ready(&mut self) -> Result<(), ()> {
        loop {
            let ueintx = self.usb.ueintx.read();
            if ueintx.rxouti().bit_is_set() {
                return Err(());
            }
            if ueintx.txini().bit_is_set() {
                return Ok(());
            }
        }
    }

    fn await_rx_out(&mut self) {
        while self.usb.ueintx.read().rxouti().bit_is_clear() {}
    }

    fn await_bank_writable(&mut self) {
        while self.usb.ueintx.read().rwal().bit_is_clear() {}
    }

    fn setup_received(&mut self) -> bool {
        self.usb.ueintx.read().rxstpi().bit_is_set()
    }

    fn rx_out_pending(&mut self) -> bool {
        self.usb.ueintx.read().rxouti().bit_is_set()
    }

    fn bank_writable(&mut self) -> bool {
        self.usb.ueintx.read().rwal().bit_is_set()
    }

    fn pull(&mut self) -> u8 {
        self.usb.uedatx.read().bits()
    }

    fn push(&mut self, byte: u8) {
        self.usb.uedatx.write(|w| unsafe { w.bits(byte) });
    }

    fn ack_setup(&mut self) {
        self.usb.ueintx.modify(|_, w| {
            w.rxstpi()
                .clear_bit()
                .rxouti()
                .clear_bit()
                .txini()
                .clear_bit()
        });
    }

    fn release_in_bank(&mut self) {
        if self.selected == KEYBOARD_ENDPOINT_NUM {
            self.usb
                .ueintx
                .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
        } else {
            self.usb.ueintx.modify(|_, w| w.txini().clear_bit());
        }
    }

    fn release_out_bank(&mut self) {
        self.usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&mut self) {
        self.usb
            .ueconx
            .modify(|_, w| w.stallrq().set_bit().epen().set_bit());
    }

    fn set_address(&mut self, address: u8) {
        self.usb
            .udaddr
            .write(|w| unsafe { w.uadd().bits(address & 0x7F) });
        self.usb.udaddr.modify(|_, w| w.adden().set_bit());
    }

    fn configure_control_endpoint(&mut self) {
        self.usb.ueconx.write(|w| w.epen().set_bit());
        self.usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        self.usb
            .uecfg1x
            .write(|w| w.epsize().bits(0b010).alloc().set_bit());

        if self.endpoint_config_ok() {
            unsafe {
                self.usb.uerst.write(|w| w.bits(1));
                self.usb.uerst.write(|w| w.bits(0));
            }
            self.usb.ueienx.write(|w| w.rxstpe().set_bit());
        }
    }

    fn configure_interrupt_in(&mut self, config: &InterruptInConfig) -> Result<(), ()> {
        self.select(config.endpoint);
        self.usb.ueconx.write(|w| w.epen().set_bit());
        self.usb
            .uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        self.usb
            .uecfg1x
            .write(|w| w.epsize().bits(0b001).epbk().bits(0b01).alloc().set_bit());
        unsafe {
            self.usb.uerst.write(|w| w.bits(0x1E));
            self.usb.uerst.write(|w| w.bits(0));
        }

        if self.endpoint_config_ok() {
            Ok(())
        } else {
            Err(())
        }
    }

    fn endpoint_config_ok(&mut self) -> bool {
        self.usb.uesta0x.read().bits() & 0x01 != 0
    }
}
