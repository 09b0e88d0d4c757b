use serde::Deserialize;
use std::{fmt, fs, path::Path, time::Duration};

use crate::note_map::MAX_OCTAVE;
use crate::session::{PedalMode, Session, MAX_PROGRAM};

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub midi: MidiSettings,
    pub controller: ControllerSettings,
    pub session: SessionSettings,
    pub lights: LightSettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MidiSettings {
    pub client_name: String,
    /// Case-insensitive substring of the output port name. Empty picks
    /// the first port.
    pub port: String,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            client_name: "rb3-keys-midi".to_string(),
            port: String::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Wireless receivers wrap the gamepad report in a 29 byte packet.
    #[serde(default)]
    pub wireless: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerSettings {
    /// Tried in order, the first one present is used.
    pub devices: Vec<UsbDevice>,
    pub interface: u8,
    pub endpoint: u8,
    pub timeout_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            devices: vec![
                // Xbox 360 Wireless Receiver for Windows
                UsbDevice {
                    vendor_id: 0x045e,
                    product_id: 0x0719,
                    wireless: true,
                },
                // Xbox 360 Wireless Receiver (first revision)
                UsbDevice {
                    vendor_id: 0x045e,
                    product_id: 0x0291,
                    wireless: true,
                },
                // Wired Xbox 360 protocol
                UsbDevice {
                    vendor_id: 0x045e,
                    product_id: 0x028e,
                    wireless: false,
                },
            ],
            interface: 0,
            endpoint: 0x81,
            timeout_ms: 8,
        }
    }
}

impl ControllerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub octave: u8,
    /// 0-based, shown to the user as 1..128.
    pub program: u8,
    pub pedal_mode: PedalMode,
    pub drum_mode: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let session = Session::default();
        Self {
            octave: session.octave,
            program: session.program,
            pedal_mode: session.pedal_mode,
            drum_mode: session.drum_mode,
        }
    }
}

impl SessionSettings {
    pub fn to_session(&self) -> Session {
        Session {
            octave: self.octave,
            program: self.program,
            pedal_mode: self.pedal_mode,
            drum_mode: self.drum_mode,
            ..Session::default()
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LightSettings {
    /// Duration of one animation frame.
    pub step_ms: u64,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self { step_ms: 100 }
    }
}

impl LightSettings {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|err| SettingsError::Read {
            path: path.display().to_string(),
            err,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(text).map_err(SettingsError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::Invalid(msg));

        if self.midi.client_name.is_empty() {
            return invalid("midi.client_name must not be empty".to_string());
        }

        if self.controller.devices.is_empty() {
            return invalid("controller.devices must list at least one device".to_string());
        }

        if self.controller.endpoint & 0x80 == 0 {
            return invalid(format!(
                "controller.endpoint {:#04x} is not an IN endpoint",
                self.controller.endpoint
            ));
        }

        if self.controller.timeout_ms == 0 {
            return invalid("controller.timeout_ms must be at least 1".to_string());
        }

        if self.session.octave > MAX_OCTAVE {
            return invalid(format!(
                "session.octave should be 0 to {MAX_OCTAVE} (found {})",
                self.session.octave
            ));
        }

        if self.session.program > MAX_PROGRAM {
            return invalid(format!(
                "session.program should be 0 to {MAX_PROGRAM} (found {})",
                self.session.program
            ));
        }

        if self.lights.step_ms == 0 {
            return invalid("lights.step_ms must be at least 1".to_string());
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Read { path: String, err: std::io::Error },
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Read { path, err } => write!(f, "can't read settings {path}: {err}"),
            SettingsError::Parse(err) => write!(f, "can't parse settings: {err}"),
            SettingsError::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}
