//! Host-side fake [`EndpointBus`] used only by `#[cfg(test)]` unit tests.
//!
//! This is not a simulator: it has no notion of USB framing or timing. It
//! just gives the protocol logic (emitter/control/idle/keyboard) something
//! that behaves like the hardware flags and FIFO register it expects, so
//! the scenarios in spec §8 ("driven by a mock host") can run on the host
//! without `avr_device` or real silicon.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::bus::{EndpointBus, EndpointIndex, InterruptInConfig};

#[derive(Default)]
struct EndpointMock {
    /// Bytes pushed since the last bank release, not yet committed.
    tx_pending: Vec<u8>,
    /// Bytes committed across all bank releases, in order.
    tx_log: Vec<u8>,
    /// Bytes queued for the firmware to `pull()` (simulated host OUT data).
    rx_queue: VecDeque<u8>,
    rx_out: bool,
    setup_received: bool,
    writable: bool,
    stalled: bool,
    bank_release_count: usize,
    config_ok: bool,
}

pub struct MockBus {
    endpoints: [EndpointMock; 8],
    selected: usize,
    pub last_address: Option<u8>,
    pub last_interrupt_config: Option<(EndpointIndex, u8)>,
    abort_after: Option<usize>,
}

impl MockBus {
    pub fn new() -> Self {
        let mut bus = Self {
            endpoints: Default::default(),
            selected: 0,
            last_address: None,
            last_interrupt_config: None,
            abort_after: None,
        };
        for ep in &mut bus.endpoints {
            ep.writable = true;
            ep.config_ok = true;
        }
        bus
    }

    /// After this many bytes have been committed on the selected endpoint,
    /// simulate the host ending the data stage early (RX-OUT set).
    pub fn abort_after_bytes(&mut self, threshold: Option<usize>) {
        self.abort_after = threshold;
    }

    /// Queue bytes for the firmware to `pull()` on the currently selected
    /// endpoint (e.g. an 8-byte SETUP packet, or a SET_REPORT payload).
    pub fn queue_incoming(&mut self, bytes: &[u8]) {
        self.endpoints[self.selected].rx_queue.extend(bytes.iter().copied());
        self.endpoints[self.selected].setup_received = true;
    }

    pub fn queue_incoming_on(&mut self, endpoint: EndpointIndex, bytes: &[u8]) {
        let ep = &mut self.endpoints[endpoint as usize];
        ep.rx_queue.extend(bytes.iter().copied());
        ep.setup_received = true;
    }

    pub fn sent_bytes(&self) -> &[u8] {
        &self.endpoints[self.selected].tx_log
    }

    pub fn sent_bytes_on(&self, endpoint: EndpointIndex) -> &[u8] {
        &self.endpoints[endpoint as usize].tx_log
    }

    pub fn bank_releases(&self) -> usize {
        self.endpoints[self.selected].bank_release_count
    }

    pub fn is_stalled(&self) -> bool {
        self.endpoints[self.selected].stalled
    }

    pub fn set_bank_writable(&mut self, endpoint: EndpointIndex, writable: bool) {
        self.endpoints[endpoint as usize].writable = writable;
    }

    pub fn set_config_ok(&mut self, endpoint: EndpointIndex, ok: bool) {
        self.endpoints[endpoint as usize].config_ok = ok;
    }

    fn current(&mut self) -> &mut EndpointMock {
        &mut self.endpoints[self.selected]
    }
}

impl EndpointBus for MockBus {
    fn select(&mut self, endpoint: EndpointIndex) {
        self.selected = endpoint as usize;
    }

    fn await_tx_ready(&mut self) -> Result<(), ()> {
        if self.current().rx_out {
            Err(())
        } else {
            Ok(())
        }
    }

    fn await_rx_out(&mut self) {
        self.current().rx_out = true;
    }

    fn await_bank_writable(&mut self) {
        self.current().writable = true;
    }

    fn setup_received(&mut self) -> bool {
        self.current().setup_received
    }

    fn rx_out_pending(&mut self) -> bool {
        self.current().rx_out
    }

    fn bank_writable(&mut self) -> bool {
        self.current().writable
    }

    fn pull(&mut self) -> u8 {
        self.current().rx_queue.pop_front().unwrap_or(0)
    }

    fn push(&mut self, byte: u8) {
        self.current().tx_pending.push(byte);
    }

    fn ack_setup(&mut self) {
        let ep = self.current();
        ep.setup_received = false;
        ep.rx_out = false;
    }

    fn release_in_bank(&mut self) {
        let abort_after = self.abort_after;
        let selected = self.selected;
        let ep = &mut self.endpoints[selected];
        ep.tx_log.extend(ep.tx_pending.drain(..));
        ep.bank_release_count += 1;
        if let Some(threshold) = abort_after {
            if ep.tx_log.len() >= threshold {
                ep.rx_out = true;
            }
        }
    }

    fn release_out_bank(&mut self) {
        self.current().rx_out = false;
    }

    fn stall(&mut self) {
        self.current().stalled = true;
    }

    fn set_address(&mut self, address: u8) {
        self.last_address = Some(address);
    }

    fn configure_control_endpoint(&mut self) {
        // Real hardware re-derives CFGOK from the write just made; the mock
        // leaves `config_ok` exactly as `set_config_ok` left it so tests can
        // simulate a failed reconfiguration.
    }

    fn configure_interrupt_in(&mut self, config: &InterruptInConfig) -> Result<(), ()> {
        self.last_interrupt_config = Some((config.endpoint, config.max_packet_size));
        if self.endpoints[config.endpoint as usize].config_ok {
            Ok(())
        } else {
            Err(())
        }
    }

    fn endpoint_config_ok(&mut self) -> bool {
        self.current().config_ok
    }
}
