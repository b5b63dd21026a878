//! The narrow hardware contract a selected USB endpoint must expose.
//!
//! This is deliberately not a general-purpose USB peripheral abstraction:
//! it is exactly the set of operations §4.1 names, no more. The control
//! state machine, descriptor emitter, and idle engine are written entirely
//! against this trait so they can run unit tests on the host against
//! [`crate::mock_bus`] and run on real silicon against
//! [`crate::avr_bus::RegisterBus`] without duplicating logic.

/// Endpoint index. Only 0 (control) and `KEYBOARD_ENDPOINT_NUM` (interrupt
/// IN) are used by this firmware, but the trait is not restricted to those.
pub type EndpointIndex = u8;

/// How the keyboard IN endpoint should be (re)configured. Passed to
/// `configure_interrupt_in` when SET_CONFIGURATION arrives.
pub struct InterruptInConfig {
    pub endpoint: EndpointIndex,
    pub max_packet_size: u8,
}

/// Per-selected-endpoint operations. All `await_*` methods busy-wait on a
/// hardware flag; per spec §5 there is no firmware-side timeout, the host
/// is the transaction master and bounds these spins itself.
pub trait EndpointBus {
    /// Make `endpoint` the target of all subsequent calls.
    fn select(&mut self, endpoint: EndpointIndex);

    /// Block until the TX-IN flag is set (bank free for the firmware to
    /// fill). Returns `Err(())` if RX-OUT became set first, meaning the
    /// host started the status stage early.
    fn await_tx_ready(&mut self) -> Result<(), ()>;

    /// Block until the RX-OUT flag is set (bank has data from the host).
    fn await_rx_out(&mut self);

    /// Block until the read/write-allowed flag is set.
    fn await_bank_writable(&mut self);

    /// True if the RX-SETUP flag is currently set on the selected endpoint.
    fn setup_received(&mut self) -> bool;

    /// True if the RX-OUT flag is currently set (non-blocking poll).
    fn rx_out_pending(&mut self) -> bool;

    /// True if the read/write-allowed flag is currently set (non-blocking).
    fn bank_writable(&mut self) -> bool;

    /// Read one byte from the FIFO data register.
    fn pull(&mut self) -> u8;

    /// Write one byte to the FIFO data register.
    fn push(&mut self, byte: u8);

    /// Clear RX-SETUP, RX-OUT and TX-IN together (acknowledges a SETUP
    /// packet and releases the control endpoint's bank in one write).
    fn ack_setup(&mut self);

    /// Release the current IN bank (clear TX-IN, and for a dual-bank
    /// interrupt endpoint also FIFOCON).
    fn release_in_bank(&mut self);

    /// Release the current OUT bank (clear RX-OUT).
    fn release_out_bank(&mut self);

    /// Refuse the current transaction: STALL-REQ + endpoint-enable.
    fn stall(&mut self);

    /// Set the device address (7 bits) and the address-enable bit.
    fn set_address(&mut self, address: u8);

    /// (Re)configure endpoint 0 as 32-byte, single-bank, control.
    fn configure_control_endpoint(&mut self);

    /// (Re)configure the keyboard endpoint as dual-bank interrupt IN, and
    /// reset all endpoints. Returns `Err(EndpointConfigFailure)`-shaped
    /// `Err(())` if the hardware reports the configuration did not take.
    fn configure_interrupt_in(&mut self, config: &InterruptInConfig) -> Result<(), ()>;

    /// Did the post-reconfiguration hardware check (CFGOK-equivalent)
    /// succeed for the currently selected endpoint?
    fn endpoint_config_ok(&mut self) -> bool;
}
