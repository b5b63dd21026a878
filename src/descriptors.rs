//! USB and HID descriptor layouts.
//!
//! Typed structs mirror the wire layout 1:1 (see USB 2.0 chapter 9, table
//! 9-5/9-10, and the HID class spec appendix B/E). Each has a const
//! `to_bytes` encoder; the concatenated configuration bundle is what the
//! descriptor emitter actually streams, since on the wire the interface,
//! HID, and endpoint descriptors are just bytes following the configuration
//! descriptor, not separate transfers.

/// Values injected into the descriptor set at build time. Defaults match
/// the wire-exact values this firmware has always shipped.
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: u16,
    /// Initial HID idle rate (4ms units). 0 disables idle refresh.
    pub idle_default: u16,
}

impl UsbConfig {
    pub const fn default_config() -> Self {
        Self {
            vendor_id: 0xfeed,
            product_id: 0x0001,
            device_version: 0x0100,
            idle_default: 125,
        }
    }
}

pub const CONTROL_ENDPOINT: u8 = 0;
pub const EP0_MAX_PACKET_SIZE: u8 = 32;
pub const KEYBOARD_ENDPOINT_NUM: u8 = 3;
pub const KEYBOARD_ENDPOINT_SIZE: u8 = 8;
pub const BANK_SIZE: usize = 32;

#[derive(Clone, Copy)]
#[repr(C)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_version: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_version: u16,
    pub manufacturer_string_index: u8,
    pub product_string_index: u8,
    pub serial_number_string_index: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub const LEN: usize = 18;

    pub const fn new(config: &UsbConfig) -> Self {
        Self {
            length: Self::LEN as u8,
            descriptor_type: 1,
            usb_version: 0x0200,
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size: EP0_MAX_PACKET_SIZE,
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            device_version: config.device_version,
            manufacturer_string_index: 0,
            product_string_index: 0,
            serial_number_string_index: 0,
            num_configurations: 1,
        }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        let ver = self.device_version.to_le_bytes();
        let usb = self.usb_version.to_le_bytes();
        [
            self.length,
            self.descriptor_type,
            usb[0],
            usb[1],
            self.device_class,
            self.device_subclass,
            self.device_protocol,
            self.max_packet_size,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            ver[0],
            ver[1],
            self.manufacturer_string_index,
            self.product_string_index,
            self.serial_number_string_index,
            self.num_configurations,
        ]
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_string_index: u8,
    pub attributes: u8,
    pub max_power: u8,
}

impl ConfigurationDescriptor {
    pub const LEN: usize = 9;

    pub const fn new(total_length: u16) -> Self {
        Self {
            length: Self::LEN as u8,
            descriptor_type: 2,
            total_length,
            num_interfaces: 1,
            configuration_value: 1,
            configuration_string_index: 0,
            attributes: 0xC0,
            max_power: 50,
        }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let total = self.total_length.to_le_bytes();
        [
            self.length,
            self.descriptor_type,
            total[0],
            total[1],
            self.num_interfaces,
            self.configuration_value,
            self.configuration_string_index,
            self.attributes,
            self.max_power,
        ]
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_string_index: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;

    pub const fn new() -> Self {
        Self {
            length: Self::LEN as u8,
            descriptor_type: 4,
            interface_number: 0,
            alternate_setting: 0,
            num_endpoints: 1,
            interface_class: 0x03,
            interface_subclass: 0x01,
            interface_protocol: 0x01,
            interface_string_index: 0,
        }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            self.length,
            self.descriptor_type,
            self.interface_number,
            self.alternate_setting,
            self.num_endpoints,
            self.interface_class,
            self.interface_subclass,
            self.interface_protocol,
            self.interface_string_index,
        ]
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct HidDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub hid_version: u16,
    pub country_code: u8,
    pub num_descriptors: u8,
    pub child_descriptor_type: u8,
    pub child_descriptor_length: u16,
}

impl HidDescriptor {
    pub const LEN: usize = 9;

    pub const fn new(report_descriptor_length: u16) -> Self {
        Self {
            length: Self::LEN as u8,
            descriptor_type: 0x21,
            hid_version: 0x0111,
            country_code: 0,
            num_descriptors: 1,
            child_descriptor_type: 0x22,
            child_descriptor_length: report_descriptor_length,
        }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let hid_ver = self.hid_version.to_le_bytes();
        let child_len = self.child_descriptor_length.to_le_bytes();
        [
            self.length,
            self.descriptor_type,
            hid_ver[0],
            hid_ver[1],
            self.country_code,
            self.num_descriptors,
            self.child_descriptor_type,
            child_len[0],
            child_len[1],
        ]
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;

    pub const fn new() -> Self {
        Self {
            length: Self::LEN as u8,
            descriptor_type: 5,
            endpoint_address: 0x80 | KEYBOARD_ENDPOINT_NUM,
            attributes: 0x03,
            max_packet_size: KEYBOARD_ENDPOINT_SIZE as u16,
            interval: 1,
        }
    }

    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let max = self.max_packet_size.to_le_bytes();
        [
            self.length,
            self.descriptor_type,
            self.endpoint_address,
            self.attributes,
            max[0],
            max[1],
            self.interval,
        ]
    }
}

/// Declared for data-model parity with `descriptor.h`'s `StringDescriptor`.
/// Never emitted: GET_DESCRIPTOR(STRING) always STALLs (see spec §9).
#[allow(dead_code)]
#[repr(C)]
pub struct StringDescriptor<'a> {
    pub length: u8,
    pub descriptor_type: u8,
    pub utf16_units: &'a [u16],
}

pub const CONFIG_BUNDLE_LEN: usize =
    ConfigurationDescriptor::LEN + InterfaceDescriptor::LEN + HidDescriptor::LEN + EndpointDescriptor::LEN;

/// The standard 6KRO boot keyboard HID report descriptor: 8 modifier input
/// bits, 1 reserved input byte, 5 LED output bits + 3 padding bits, 6 key
/// array input bytes (logical range 0..=101, per the HID usage tables).
pub const HID_REPORT_DESCRIPTOR: [u8; 63] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) -- modifier byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) -- reserved byte
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute) -- LEDs
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) -- LED padding
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

/// Compile-time-immutable descriptor set for one `UsbConfig`.
pub struct DescriptorSet {
    pub device: [u8; DeviceDescriptor::LEN],
    pub config_bundle: [u8; CONFIG_BUNDLE_LEN],
    /// The HID descriptor alone, also embedded at `config_bundle[18..27]`.
    /// Kept separately since GET_DESCRIPTOR(wValue hi = 0x21) fetches it on
    /// its own (spec §4.2's table), not as part of the configuration walk.
    pub hid_descriptor: [u8; HidDescriptor::LEN],
}

impl DescriptorSet {
    pub const fn build(config: &UsbConfig) -> Self {
        let device = DeviceDescriptor::new(config).to_bytes();

        let cfg = ConfigurationDescriptor::new(CONFIG_BUNDLE_LEN as u16).to_bytes();
        let iface = InterfaceDescriptor::new().to_bytes();
        let hid = HidDescriptor::new(HID_REPORT_DESCRIPTOR.len() as u16).to_bytes();
        let ep = EndpointDescriptor::new().to_bytes();

        let mut bundle = [0u8; CONFIG_BUNDLE_LEN];
        let mut i = 0;
        let mut j = 0;
        while j < cfg.len() {
            bundle[i] = cfg[j];
            i += 1;
            j += 1;
        }
        j = 0;
        while j < iface.len() {
            bundle[i] = iface[j];
            i += 1;
            j += 1;
        }
        j = 0;
        while j < hid.len() {
            bundle[i] = hid[j];
            i += 1;
            j += 1;
        }
        j = 0;
        while j < ep.len() {
            bundle[i] = ep[j];
            i += 1;
            j += 1;
        }

        Self {
            device,
            config_bundle: bundle,
            hid_descriptor: hid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_bundle_total_length_is_34() {
        assert_eq!(CONFIG_BUNDLE_LEN, 34);
        let set = DescriptorSet::build(&UsbConfig::default_config());
        let total_length = u16::from_le_bytes([set.config_bundle[2], set.config_bundle[3]]);
        assert_eq!(total_length, 34);
    }

    #[test]
    fn device_descriptor_wire_values() {
        let set = DescriptorSet::build(&UsbConfig::default_config());
        assert_eq!(set.device.len(), 18);
        assert_eq!(set.device[0], 18); // bLength
        assert_eq!(set.device[1], 1); // bDescriptorType
        assert_eq!(set.device[7], 32); // bMaxPacketSize0
        assert_eq!(u16::from_le_bytes([set.device[8], set.device[9]]), 0xfeed);
        assert_eq!(u16::from_le_bytes([set.device[10], set.device[11]]), 0x0001);
    }

    #[test]
    fn endpoint_descriptor_targets_ep3_in_interrupt() {
        let ep = EndpointDescriptor::new().to_bytes();
        assert_eq!(ep[2], 0x83); // 0x80 | 3
        assert_eq!(ep[3], 0x03); // interrupt
        assert_eq!(u16::from_le_bytes([ep[4], ep[5]]), 8);
        assert_eq!(ep[6], 1);
    }

    #[test]
    fn hid_descriptor_child_length_matches_report_descriptor() {
        let hid = HidDescriptor::new(HID_REPORT_DESCRIPTOR.len() as u16).to_bytes();
        assert_eq!(
            u16::from_le_bytes([hid[7], hid[8]]),
            HID_REPORT_DESCRIPTOR.len() as u16
        );
    }
}
