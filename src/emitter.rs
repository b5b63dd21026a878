//! Descriptor Emitter (spec §4.2).
//!
//! Streams a descriptor, or a concatenation of descriptors, into the
//! control endpoint's FIFO in 32-byte bank-sized chunks, honouring the
//! host's requested length and the absolute 255-byte control-transfer cap.
//! Grounded directly on `original_source/usb.c`'s `write_descriptor` /
//! `write_descriptors` / `pause_tx`.

use crate::bus::EndpointBus;
use crate::descriptors::BANK_SIZE;
use crate::error::UsbError;

/// Emit `min(request_length, 255, descriptor.len())` bytes of a single
/// descriptor. The control endpoint must already be selected.
pub fn write_descriptor<B: EndpointBus>(
    bus: &mut B,
    request_length: u16,
    descriptor: &[u8],
) -> Result<usize, UsbError> {
    let capped_request = core::cmp::min(request_length, 255) as usize;
    let len = core::cmp::min(descriptor.len(), capped_request);

    let mut sent = 0;
    while sent < len {
        match bus.await_tx_ready() {
            Ok(()) => {}
            Err(()) => return Err(UsbError::HostAbortedDataStage),
        }

        let packet_size = core::cmp::min(len - sent, BANK_SIZE);
        for &byte in &descriptor[sent..sent + packet_size] {
            bus.push(byte);
        }
        bus.release_in_bank();
        sent += packet_size;
    }

    Ok(len)
}

/// Emit the concatenation of `descriptors` in order, as one logical
/// transfer (used for the configuration bundle: Config + Interface + HID +
/// Endpoint). Unlike `write_descriptor`, bank boundaries can fall inside a
/// single child descriptor, so the remaining-bank-space bookkeeping is
/// tracked across the whole list rather than per descriptor.
pub fn write_descriptors<B: EndpointBus>(
    bus: &mut B,
    request_length: u16,
    descriptors: &[&[u8]],
) -> Result<usize, UsbError> {
    let total_len: usize = descriptors.iter().map(|d| d.len()).sum();
    let capped_request = core::cmp::min(request_length, 255) as usize;
    let len = core::cmp::min(total_len, capped_request);

    let mut remaining_in_bank = BANK_SIZE;
    let mut emitted = 0;

    'outer: for descriptor in descriptors {
        let mut offset = 0;
        while offset < descriptor.len() {
            if emitted >= len {
                break 'outer;
            }
            let bank_budget = core::cmp::min(remaining_in_bank, len - emitted);
            let chunk = core::cmp::min(bank_budget, descriptor.len() - offset);
            if chunk == 0 {
                break 'outer;
            }
            for &byte in &descriptor[offset..offset + chunk] {
                bus.push(byte);
            }
            offset += chunk;
            emitted += chunk;
            remaining_in_bank -= chunk;

            if remaining_in_bank == 0 {
                bus.release_in_bank();
                match bus.await_tx_ready() {
                    Ok(()) => {}
                    Err(()) => return Err(UsbError::HostAbortedDataStage),
                }
                remaining_in_bank = BANK_SIZE;
            }
        }
    }

    bus.release_in_bank();
    Ok(emitted)
}
