use std::time::Duration;

use rusb::{Context, DeviceHandle, Error, UsbContext};

use super::input_state::{InputState, REPORT_LEN};
use crate::settings::{ControllerSettings, UsbDevice};

const WIRED_REPORT_SIZE: u8 = 0x14;
const WIRELESS_HEADER_LEN: usize = 4;
const WIRELESS_STATUS: u8 = 0x08;
const WIRELESS_CONNECTED: u8 = 0x80;
/// `data[1]` of a receiver packet that carries pad input. Other values
/// (0x0f announce, 0x00 idle, ...) are receiver housekeeping.
const WIRELESS_PAD_DATA: u8 = 0x01;

/// State before and after one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChange {
    pub previous: InputState,
    pub current: InputState,
}

/// What a single USB packet carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Input(InputState),
    /// Wireless link status, `true` when a controller is attached.
    Link(bool),
    Other,
}

/// Classify a raw interrupt packet from a wired pad or wireless receiver.
pub fn decode_packet(data: &[u8], wireless: bool) -> Packet {
    if wireless {
        match data {
            [WIRELESS_STATUS, status, ..] => Packet::Link(status & WIRELESS_CONNECTED != 0),
            [0x00, WIRELESS_PAD_DATA, ..] if data.len() >= WIRELESS_HEADER_LEN + REPORT_LEN => {
                InputState::from_report(&data[WIRELESS_HEADER_LEN..])
                    .map_or(Packet::Other, Packet::Input)
            }
            _ => Packet::Other,
        }
    } else {
        match data {
            [0x00, WIRED_REPORT_SIZE, ..] => {
                InputState::from_report(data).map_or(Packet::Other, Packet::Input)
            }
            _ => Packet::Other,
        }
    }
}

/// Polls the keyboard over USB and hands out consecutive snapshots.
pub struct KeyboardController {
    _context: Context,
    handle: DeviceHandle<Context>,
    device: UsbDevice,
    interface: u8,
    endpoint: u8,
    input_buf: [u8; 32],
    timeout: Duration,
    last_state: InputState,
    initialized: bool,
}

impl KeyboardController {
    /// Open the first configured device found on the bus.
    pub fn connect(settings: &ControllerSettings) -> rusb::Result<Self> {
        let context = Context::new()?;
        let mut found = None;

        'search: for wanted in &settings.devices {
            for device in context.devices()?.iter() {
                let desc = device.device_descriptor()?;
                if desc.vendor_id() == wanted.vendor_id && desc.product_id() == wanted.product_id
                {
                    found = Some((device.open()?, *wanted));
                    break 'search;
                }
            }
        }

        let (mut handle, device) = match found {
            Some(found) => found,
            None => {
                log::error!("No Rock Band 3 keyboard receiver found.");
                return Err(Error::NoDevice);
            }
        };

        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            log::debug!("kernel driver auto-detach unavailable: {err}");
        }
        handle.claim_interface(settings.interface)?;

        log::info!(
            "Opened {:04x}:{:04x} ({}), interface {}, endpoint {:#04x}",
            device.vendor_id,
            device.product_id,
            if device.wireless { "wireless" } else { "wired" },
            settings.interface,
            settings.endpoint
        );

        Ok(Self {
            _context: context,
            handle,
            device,
            interface: settings.interface,
            endpoint: settings.endpoint,
            input_buf: [0; 32],
            timeout: settings.timeout(),
            last_state: InputState::default(),
            initialized: false,
        })
    }

    /// Perform a single USB read.
    ///
    /// Returns the previous and new state when an input report arrived.
    /// The first report after connecting only seeds the previous state.
    /// Losing the wireless link reports every control as released.
    pub fn poll_once(&mut self) -> rusb::Result<Option<InputChange>> {
        let len = match self
            .handle
            .read_interrupt(self.endpoint, &mut self.input_buf, self.timeout)
        {
            Ok(len) => len,
            Err(Error::Timeout) => return Ok(None),
            Err(err) => return Err(err),
        };

        match decode_packet(&self.input_buf[..len], self.device.wireless) {
            Packet::Input(state) => Ok(self.advance(state)),
            Packet::Link(true) => {
                log::info!("keyboard connected");
                Ok(None)
            }
            Packet::Link(false) => {
                log::info!("keyboard disconnected");
                let change = self.advance(InputState::default());
                self.initialized = false;
                Ok(change)
            }
            Packet::Other => Ok(None),
        }
    }

    fn advance(&mut self, state: InputState) -> Option<InputChange> {
        if !self.initialized {
            self.last_state = state;
            self.initialized = true;
            return None;
        }

        let previous = std::mem::replace(&mut self.last_state, state);
        Some(InputChange {
            previous,
            current: self.last_state.clone(),
        })
    }
}

impl Drop for KeyboardController {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }
}
