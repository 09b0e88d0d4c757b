use crate::note_map::{Key, KEY_COUNT};

/// Velocity given to pressed keys the report has no velocity slot for.
pub const DEFAULT_VELOCITY: u8 = 64;

/// Length of the gamepad part of an XInput report that we decode.
pub const REPORT_LEN: usize = 14;

const VELOCITY_SLOTS: usize = 5;

const BUTTON_DPAD_UP: u16 = 0x0001;
const BUTTON_DPAD_DOWN: u16 = 0x0002;
const BUTTON_DPAD_LEFT: u16 = 0x0004;
const BUTTON_DPAD_RIGHT: u16 = 0x0008;
const BUTTON_START: u16 = 0x0010;
const BUTTON_BACK: u16 = 0x0020;
const BUTTON_GUIDE: u16 = 0x0400;
const BUTTON_A: u16 = 0x1000;
const BUTTON_B: u16 = 0x2000;
const BUTTON_X: u16 = 0x4000;
const BUTTON_Y: u16 = 0x8000;

/// Snapshot of everything the keyboard reports in one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    // Face and system buttons
    pub btn_a: bool,
    pub btn_b: bool,
    pub btn_x: bool,
    pub btn_y: bool,
    pub btn_start: bool,
    pub btn_back: bool,
    pub btn_guide: bool,
    pub overdrive: bool,
    // D-pad
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    // Pedal port
    pub pedal_digital: bool,
    pub pedal_analog: u8,
    // Keys C1..C3, see `note_map::Key`
    pub key: [bool; KEY_COUNT],
    pub velocity: [u8; KEY_COUNT],
}

impl InputState {
    /// Decode an XInput gamepad report.
    ///
    /// Layout (offsets into `report`):
    ///
    /// | bytes  | content                                             |
    /// |--------|-----------------------------------------------------|
    /// | 2..4   | button word, little endian                          |
    /// | 4      | keys C1..G1, bit 7 = C1                             |
    /// | 5      | keys G#1..D#2, bit 7 = G#1                          |
    /// | 6      | keys E2..B2, bit 7 = E2                             |
    /// | 7      | bit 7 = C3, bits 0-6 = velocity slot 1              |
    /// | 8..12  | velocity slots 2-5 (bits 0-6 of each byte)          |
    /// | 12     | bit 7 = overdrive                                   |
    /// | 13     | bit 7 = digital pedal, bits 0-6 = analog pedal      |
    ///
    /// Velocity slots are handed out to pressed keys from the lowest key up.
    pub fn from_report(report: &[u8]) -> Option<Self> {
        if report.len() < REPORT_LEN {
            return None;
        }

        let buttons = u16::from_le_bytes([report[2], report[3]]);
        let button = |mask: u16| buttons & mask != 0;

        let mut key = [false; KEY_COUNT];
        let c3 = Key::C3.index();
        for (byte_idx, chunk) in key[..c3].chunks_mut(8).enumerate() {
            let byte = report[4 + byte_idx];
            for (bit, pressed) in chunk.iter_mut().enumerate() {
                *pressed = byte & (0x80 >> bit) != 0;
            }
        }
        key[c3] = report[7] & 0x80 != 0;

        let slots = [
            report[7] & 0x7F,
            report[8] & 0x7F,
            report[9] & 0x7F,
            report[10] & 0x7F,
            report[11] & 0x7F,
        ];
        let mut velocity = [0u8; KEY_COUNT];
        let mut next_slot = 0;
        for (i, pressed) in key.iter().enumerate() {
            if !pressed {
                continue;
            }
            velocity[i] = if next_slot < VELOCITY_SLOTS {
                slots[next_slot]
            } else {
                DEFAULT_VELOCITY
            };
            next_slot += 1;
        }

        Some(Self {
            btn_a: button(BUTTON_A),
            btn_b: button(BUTTON_B),
            btn_x: button(BUTTON_X),
            btn_y: button(BUTTON_Y),
            btn_start: button(BUTTON_START),
            btn_back: button(BUTTON_BACK),
            btn_guide: button(BUTTON_GUIDE),
            overdrive: report[12] & 0x80 != 0,
            dpad_up: button(BUTTON_DPAD_UP),
            dpad_down: button(BUTTON_DPAD_DOWN),
            dpad_left: button(BUTTON_DPAD_LEFT),
            dpad_right: button(BUTTON_DPAD_RIGHT),
            pedal_digital: report[13] & 0x80 != 0,
            pedal_analog: report[13] & 0x7F,
            key,
            velocity,
        })
    }

    /// Keys held down, lowest first.
    #[allow(dead_code)]
    pub fn pressed_keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.key
            .iter()
            .enumerate()
            .filter_map(|(i, pressed)| pressed.then_some(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> [u8; 20] {
        let mut buf = [0u8; 20];
        buf[1] = 0x14;
        buf
    }

    #[test]
    fn short_report_is_rejected() {
        assert!(InputState::from_report(&[0u8; 10]).is_none());
    }

    #[test]
    fn idle_report_is_default_state() {
        let state = InputState::from_report(&report()).unwrap();
        assert_eq!(state, InputState::default());
    }

    #[test]
    fn decodes_buttons() {
        let mut buf = report();
        let word = BUTTON_A | BUTTON_GUIDE | BUTTON_DPAD_LEFT;
        buf[2..4].copy_from_slice(&word.to_le_bytes());

        let state = InputState::from_report(&buf).unwrap();
        assert!(state.btn_a);
        assert!(state.btn_guide);
        assert!(state.dpad_left);
        assert!(!state.btn_b);
        assert!(!state.btn_start);
        assert!(!state.dpad_up);
    }

    #[test]
    fn decodes_key_bits_and_velocities() {
        let mut buf = report();
        buf[4] = 0x80; // C1
        buf[5] = 0x01; // D#2
        buf[7] = 0x80 | 90; // C3, first velocity
        buf[8] = 70;
        buf[9] = 50;

        let state = InputState::from_report(&buf).unwrap();
        let pressed: Vec<usize> = state.pressed_keys().collect();
        assert_eq!(
            pressed,
            vec![Key::C1.index(), Key::Eb2.index(), Key::C3.index()]
        );
        assert_eq!(state.velocity[Key::C1.index()], 90);
        assert_eq!(state.velocity[Key::Eb2.index()], 70);
        assert_eq!(state.velocity[Key::C3.index()], 50);
        assert_eq!(state.velocity[Key::D1.index()], 0);
    }

    #[test]
    fn keys_past_fifth_get_default_velocity() {
        let mut buf = report();
        buf[4] = 0xFC; // C1..F1, six keys
        buf[7] = 10;
        buf[8] = 20;
        buf[9] = 30;
        buf[10] = 40;
        buf[11] = 50;

        let state = InputState::from_report(&buf).unwrap();
        assert_eq!(state.velocity[..6], [10, 20, 30, 40, 50, DEFAULT_VELOCITY]);
    }

    #[test]
    fn decodes_pedal_and_overdrive() {
        let mut buf = report();
        buf[12] = 0x80;
        buf[13] = 0x80 | 42;

        let state = InputState::from_report(&buf).unwrap();
        assert!(state.overdrive);
        assert!(state.pedal_digital);
        assert_eq!(state.pedal_analog, 42);
    }
}
