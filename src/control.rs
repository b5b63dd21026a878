//! Control Endpoint State Machine (spec §4.3).
//!
//! Parses a SETUP packet off endpoint 0 and dispatches it to the matching
//! standard or HID class request handler, falling back to a STALL for
//! anything unrecognised. Grounded directly on `original_source/usb.c`'s
//! `ISR(USB_COM_vect)` — the dispatch order and per-request wire behaviour
//! here mirror that ISR line for line, just split into named handlers and
//! driven through [`EndpointBus`] instead of raw AVR registers.

use crate::bus::{EndpointBus, InterruptInConfig};
use crate::descriptors::{DescriptorSet, CONTROL_ENDPOINT, HID_REPORT_DESCRIPTOR, KEYBOARD_ENDPOINT_NUM, KEYBOARD_ENDPOINT_SIZE};
use crate::emitter::{write_descriptor, write_descriptors};
use crate::error::UsbError;
use crate::state::{DeviceAggregate, Protocol};

// Standard request codes (USB 2.0 Table 9-4).
const GET_STATUS: u8 = 0x00;
const SET_ADDRESS: u8 = 0x05;
const GET_DESCRIPTOR: u8 = 0x06;
const GET_CONFIGURATION: u8 = 0x08;
const SET_CONFIGURATION: u8 = 0x09;

// HID class request codes (HID 1.11 §7.2).
const GET_REPORT: u8 = 0x01;
const GET_IDLE: u8 = 0x02;
const GET_PROTOCOL: u8 = 0x03;
const SET_REPORT: u8 = 0x09;
const SET_IDLE: u8 = 0x0A;
const SET_PROTOCOL: u8 = 0x0B;

// wValue high bytes for GET_DESCRIPTOR.
const DESCRIPTOR_TYPE_DEVICE: u8 = 0x01;
const DESCRIPTOR_TYPE_CONFIGURATION: u8 = 0x02;
const DESCRIPTOR_TYPE_HID: u8 = 0x21;
const DESCRIPTOR_TYPE_HID_REPORT: u8 = 0x22;

/// An 8-byte control SETUP packet (USB 2.0 Table 9-2), pulled off the FIFO
/// byte by byte in wire order.
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn read<B: EndpointBus>(bus: &mut B) -> Self {
        let request_type = bus.pull();
        let request = bus.pull();
        let value_lo = bus.pull();
        let value_hi = bus.pull();
        let index_lo = bus.pull();
        let index_hi = bus.pull();
        let length_lo = bus.pull();
        let length_hi = bus.pull();
        Self {
            request_type,
            request,
            value: u16::from_le_bytes([value_lo, value_hi]),
            index: u16::from_le_bytes([index_lo, index_hi]),
            length: u16::from_le_bytes([length_lo, length_hi]),
        }
    }

    fn value_hi(&self) -> u8 {
        (self.value >> 8) as u8
    }
}

/// Handle one pending SETUP packet on endpoint 0, if any. No-op if
/// `setup_received` is false. Grounded on the top of `ISR(USB_COM_vect)`.
pub fn handle_setup<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    descriptors: &DescriptorSet,
) -> Result<(), UsbError> {
    bus.select(CONTROL_ENDPOINT);
    if !bus.setup_received() {
        return Ok(());
    }

    let setup = SetupPacket::read(bus);
    bus.ack_setup();

    if setup.request == GET_DESCRIPTOR {
        return stall_is_not_an_error(handle_get_descriptor(bus, &setup, descriptors));
    }

    if setup.request == SET_CONFIGURATION && setup.request_type == 0 {
        return handle_set_configuration(bus, agg, &setup);
    }

    if setup.request == SET_ADDRESS {
        return handle_set_address(bus, agg, &setup);
    }

    if setup.request == GET_CONFIGURATION && setup.request_type == 0x80 {
        return handle_get_configuration(bus, agg);
    }

    if setup.request == GET_STATUS {
        return handle_get_status(bus);
    }

    if setup.index == 0 {
        if setup.request_type == 0xA1 {
            match setup.request {
                GET_REPORT => return handle_get_report(bus, agg),
                GET_IDLE => return handle_get_idle(bus, agg),
                GET_PROTOCOL => return handle_get_protocol(bus, agg),
                _ => {}
            }
        }
        if setup.request_type == 0x21 {
            match setup.request {
                SET_REPORT => return handle_set_report(bus, agg),
                SET_IDLE => return handle_set_idle(bus, agg, &setup),
                SET_PROTOCOL => return handle_set_protocol(bus, agg, &setup),
                _ => {}
            }
        }
    }

    bus.stall();
    stall_is_not_an_error(Err(UsbError::UnsupportedRequest))
}

/// A STALL handshake is a recognised recovery path, not a firmware fault
/// (spec §7/§10.2): the endpoint stays enabled and the host retries or
/// moves on. `handle_setup` swallows the two stall-classified errors here
/// so its own caller (an ISR, or the foreground) sees a clean `Ok(())`;
/// the sub-handlers above still return the real `Err` so unit tests that
/// call them directly can assert on which case fired.
fn stall_is_not_an_error(result: Result<(), UsbError>) -> Result<(), UsbError> {
    match result {
        Err(UsbError::UnsupportedDescriptor) | Err(UsbError::UnsupportedRequest) => Ok(()),
        other => other,
    }
}

fn handle_get_descriptor<B: EndpointBus>(
    bus: &mut B,
    setup: &SetupPacket,
    descriptors: &DescriptorSet,
) -> Result<(), UsbError> {
    match setup.value_hi() {
        DESCRIPTOR_TYPE_DEVICE => {
            write_descriptor(bus, setup.length, &descriptors.device)?;
            Ok(())
        }
        DESCRIPTOR_TYPE_CONFIGURATION => {
            use crate::descriptors::{ConfigurationDescriptor, EndpointDescriptor, HidDescriptor, InterfaceDescriptor};
            let bundle = &descriptors.config_bundle;
            let mut offset = 0;
            let cfg = &bundle[offset..offset + ConfigurationDescriptor::LEN];
            offset += ConfigurationDescriptor::LEN;
            let iface = &bundle[offset..offset + InterfaceDescriptor::LEN];
            offset += InterfaceDescriptor::LEN;
            let hid = &bundle[offset..offset + HidDescriptor::LEN];
            offset += HidDescriptor::LEN;
            let ep = &bundle[offset..offset + EndpointDescriptor::LEN];
            write_descriptors(bus, setup.length, &[cfg, iface, hid, ep])?;
            Ok(())
        }
        DESCRIPTOR_TYPE_HID => {
            write_descriptor(bus, setup.length, &descriptors.hid_descriptor)?;
            Ok(())
        }
        DESCRIPTOR_TYPE_HID_REPORT => {
            write_descriptor(bus, setup.length, &HID_REPORT_DESCRIPTOR)?;
            Ok(())
        }
        _ => {
            bus.stall();
            Err(UsbError::UnsupportedDescriptor)
        }
    }
}

fn handle_set_configuration<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    setup: &SetupPacket,
) -> Result<(), UsbError> {
    let value = setup.value as u8;
    agg.on_set_configuration(value);
    bus.release_in_bank();

    bus.select(KEYBOARD_ENDPOINT_NUM);
    let config = InterruptInConfig {
        endpoint: KEYBOARD_ENDPOINT_NUM,
        max_packet_size: KEYBOARD_ENDPOINT_SIZE,
    };
    bus.configure_interrupt_in(&config)
        .map_err(|()| UsbError::EndpointConfigFailure)
}

fn handle_set_address<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    setup: &SetupPacket,
) -> Result<(), UsbError> {
    bus.release_in_bank();
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    let address = setup.value as u8;
    agg.address = address;
    bus.set_address(address);
    Ok(())
}

fn handle_get_configuration<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    bus.push(agg.configuration_value);
    bus.release_in_bank();
    Ok(())
}

fn handle_get_status<B: EndpointBus>(bus: &mut B) -> Result<(), UsbError> {
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    bus.push(0);
    bus.push(0);
    bus.release_in_bank();
    Ok(())
}

fn handle_get_report<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    for byte in agg.report.to_bytes() {
        bus.push(byte);
    }
    bus.release_in_bank();
    Ok(())
}

fn handle_get_idle<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    bus.push(agg.idle_value as u8);
    bus.release_in_bank();
    Ok(())
}

fn handle_get_protocol<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    bus.await_tx_ready().map_err(|()| UsbError::HostAbortedDataStage)?;
    bus.push(agg.protocol.as_u8());
    bus.release_in_bank();
    Ok(())
}

fn handle_set_report<B: EndpointBus>(bus: &mut B, agg: &mut DeviceAggregate) -> Result<(), UsbError> {
    bus.await_rx_out();
    agg.led_shadow = bus.pull();
    bus.release_in_bank();
    bus.release_out_bank();
    Ok(())
}

fn handle_set_idle<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    setup: &SetupPacket,
) -> Result<(), UsbError> {
    agg.idle_value = setup.value;
    agg.current_idle = 0;
    bus.release_in_bank();
    Ok(())
}

fn handle_set_protocol<B: EndpointBus>(
    bus: &mut B,
    agg: &mut DeviceAggregate,
    setup: &SetupPacket,
) -> Result<(), UsbError> {
    agg.protocol = Protocol::from_bit(setup.value_hi());
    bus.release_in_bank();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::UsbConfig;
    use crate::mock_bus::MockBus;

    fn setup(_descriptors: &DescriptorSet) -> (MockBus, DeviceAggregate) {
        (MockBus::new(), DeviceAggregate::new(125))
    }

    fn queue_setup(bus: &mut MockBus, request_type: u8, request: u8, value: u16, index: u16, length: u16) {
        bus.select(CONTROL_ENDPOINT);
        let mut bytes = [0u8; 8];
        bytes[0] = request_type;
        bytes[1] = request;
        bytes[2..4].copy_from_slice(&value.to_le_bytes());
        bytes[4..6].copy_from_slice(&index.to_le_bytes());
        bytes[6..8].copy_from_slice(&length.to_le_bytes());
        bus.queue_incoming(&bytes);
    }

    #[test]
    fn enumeration_sequence_sets_address_and_configuration() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        queue_setup(&mut bus, 0x00, GET_DESCRIPTOR, 0x0100, 0, 18);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.sent_bytes(), &descriptors.device[..]);

        queue_setup(&mut bus, 0x00, SET_ADDRESS, 5, 0, 0);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.last_address, Some(5));
        assert_eq!(agg.address, 5);

        queue_setup(&mut bus, 0x00, SET_CONFIGURATION, 1, 0, 0);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(agg.configuration_value, 1);
        assert_eq!(
            bus.last_interrupt_config,
            Some((KEYBOARD_ENDPOINT_NUM, KEYBOARD_ENDPOINT_SIZE))
        );
    }

    #[test]
    fn hid_descriptor_and_report_descriptor_are_distinct_fetches() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        queue_setup(&mut bus, 0x81, GET_DESCRIPTOR, 0x2100, 0, 9);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.sent_bytes(), &descriptors.hid_descriptor[..]);

        queue_setup(&mut bus, 0x81, GET_DESCRIPTOR, 0x2200, 0, 63);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.sent_bytes_on(CONTROL_ENDPOINT), &HID_REPORT_DESCRIPTOR[..]);
    }

    #[test]
    fn get_descriptor_sub_handler_still_surfaces_the_real_error() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let mut bus = MockBus::new();
        let setup = SetupPacket {
            request_type: 0x80,
            request: GET_DESCRIPTOR,
            value: 0x0300,
            index: 0,
            length: 255,
        };
        let result = handle_get_descriptor(&mut bus, &setup, &descriptors);
        assert_eq!(result, Err(UsbError::UnsupportedDescriptor));
    }

    #[test]
    fn unsupported_descriptor_stalls() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        queue_setup(&mut bus, 0x80, GET_DESCRIPTOR, 0x0300, 0, 255);
        let result = handle_setup(&mut bus, &mut agg, &descriptors);
        assert_eq!(result, Ok(()));
        assert!(bus.is_stalled());
    }

    #[test]
    fn set_idle_then_get_idle_round_trips() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        queue_setup(&mut bus, 0x21, SET_IDLE, 0x4200, 0, 0);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(agg.idle_value, 0x4200);
        assert_eq!(agg.current_idle, 0);

        queue_setup(&mut bus, 0xA1, GET_IDLE, 0, 0, 1);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.sent_bytes(), &[0x00]);
    }

    #[test]
    fn set_protocol_then_get_protocol_round_trips() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        queue_setup(&mut bus, 0x21, SET_PROTOCOL, 0x0100, 0, 0);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(agg.protocol, Protocol::Report);

        queue_setup(&mut bus, 0xA1, GET_PROTOCOL, 0, 0, 1);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(bus.sent_bytes(), &[0x01]);
    }

    #[test]
    fn set_report_captures_led_byte() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);

        bus.select(CONTROL_ENDPOINT);
        let mut bytes = [0u8; 8];
        bytes[0] = 0x21;
        bytes[1] = SET_REPORT;
        bytes[6] = 1;
        bus.queue_incoming(&bytes);
        bus.queue_incoming(&[0b0000_0011]);
        handle_setup(&mut bus, &mut agg, &descriptors).unwrap();
        assert_eq!(agg.led_shadow, 0b0000_0011);
    }

    #[test]
    fn no_pending_setup_is_a_no_op() {
        let descriptors = DescriptorSet::build(&UsbConfig::default_config());
        let (mut bus, mut agg) = setup(&descriptors);
        assert_eq!(handle_setup(&mut bus, &mut agg, &descriptors), Ok(()));
    }
}
