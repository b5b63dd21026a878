//! The device-state aggregate shared between foreground and the two ISR
//! contexts (spec §3, §9). Every field that can be touched from both an ISR
//! and the foreground lives here; callers reach it only through
//! [`crate::keyboard::Keyboard::with_state`]-style critical sections so the
//! borrow discipline stays visible at each call site rather than hidden
//! inside an abstraction (spec §9: "avoid any abstraction that hides the
//! borrow").

/// One of {Unknown, Disconnected, Attached}. A bus reset always lands back
/// in `Disconnected`, regardless of prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Unknown,
    Disconnected,
    Attached,
}

/// HID protocol selector: Boot (0) or Report (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Boot,
    Report,
}

impl Protocol {
    pub const fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Protocol::Boot
        } else {
            Protocol::Report
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Protocol::Boot => 0,
            Protocol::Report => 1,
        }
    }
}

/// The 8-byte HID boot keyboard report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            keys: [0; 6],
        }
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        [
            self.modifier,
            0,
            self.keys[0],
            self.keys[1],
            self.keys[2],
            self.keys[3],
            self.keys[4],
            self.keys[5],
        ]
    }
}

/// Every field mutated by both an ISR and the foreground, plus the
/// foreground-only pressed-key snapshot that feeds `submit_report`.
pub struct DeviceAggregate {
    pub device_state: DeviceState,
    pub address: u8,
    pub configuration_value: u8,
    /// HID idle rate, 4ms units, taken verbatim from SET_IDLE's `wValue`
    /// (spec §9 open question: the low byte is not masked off).
    pub idle_value: u16,
    /// SOF-derived ticks toward `idle_value`.
    pub current_idle: u16,
    /// Free-running SOF counter, only its low 2 bits matter (÷4 prescale).
    pub sof_prescaler: u8,
    pub protocol: Protocol,
    /// LED bitmap captured on SET_REPORT (Num/Caps/Scroll/Compose/Kana).
    pub led_shadow: u8,
    pub report: KeyboardReport,
}

impl DeviceAggregate {
    pub const fn new(idle_default: u16) -> Self {
        Self {
            device_state: DeviceState::Unknown,
            address: 0,
            configuration_value: 0,
            idle_value: idle_default,
            current_idle: 0,
            sof_prescaler: 0,
            protocol: Protocol::Boot,
            led_shadow: 0,
            report: KeyboardReport::empty(),
        }
    }

    /// Bus reset always lands in `Disconnected`, regardless of prior state.
    pub fn on_bus_reset(&mut self) {
        self.device_state = DeviceState::Disconnected;
    }

    pub fn on_set_configuration(&mut self, value: u8) {
        self.configuration_value = value;
        if value != 0 {
            self.device_state = DeviceState::Attached;
        }
    }
}
