/// Number of keys on the keyboard (C1 through C3).
pub const KEY_COUNT: usize = 25;

/// Number of low keys that are redirected to percussion in drum mode.
pub const DRUM_KEY_COUNT: usize = 12;

/// Highest octave the host is allowed to select.
pub const MAX_OCTAVE: u8 = 8;

/// MIDI channel (0-based) that General MIDI reserves for percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Named key positions. The discriminant is the index into every
/// per-key array (`InputState::key`, `InputState::velocity`, `NoteTable`).
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Key {
    C1 = 0,
    Db1,
    D1,
    Eb1,
    E1,
    F1,
    Gb1,
    G1,
    Ab1,
    A1,
    Bb1,
    B1,
    C2,
    Db2,
    D2,
    Eb2,
    E2,
    F2,
    Gb2,
    G2,
    Ab2,
    A2,
    Bb2,
    B2,
    C3,
}

impl Key {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// General MIDI percussion notes used for keys C1..B1 in drum mode.
pub const DRUM_NOTES: [u8; DRUM_KEY_COUNT] = [
    35, // Acoustic Bass Drum
    36, // Bass Drum 1
    38, // Acoustic Snare
    40, // Electric Snare
    41, // Low Floor Tom
    47, // Low-Mid Tom
    50, // High Tom
    42, // Closed Hi-Hat
    46, // Open Hi-Hat
    49, // Crash Cymbal 1
    51, // Ride Cymbal 1
    53, // Ride Bell
];

/// MIDI note number for every key, indexed by [`Key`].
pub type NoteTable = [u8; KEY_COUNT];

/// Build the key-to-note table for an octave.
///
/// Key `i` plays `octave * 12 + i`. In drum mode the lowest twelve keys
/// play [`DRUM_NOTES`] instead, whatever the octave.
///
/// Panics if `octave` is above [`MAX_OCTAVE`]; clamping is the caller's job.
pub fn build(octave: u8, drum_mode: bool) -> NoteTable {
    assert!(
        octave <= MAX_OCTAVE,
        "octave {octave} out of range 0..={MAX_OCTAVE}"
    );

    let base = octave * 12;
    let mut table: NoteTable = std::array::from_fn(|i| base + i as u8);

    if drum_mode {
        table[..DRUM_KEY_COUNT].copy_from_slice(&DRUM_NOTES);
    }

    table
}

/// Whether key `index` sends on the percussion channel.
pub fn is_drum_key(index: usize, drum_mode: bool) -> bool {
    drum_mode && index < DRUM_KEY_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromatic_from_octave_base() {
        for octave in 0..=MAX_OCTAVE {
            let table = build(octave, false);
            for (i, note) in table.iter().enumerate() {
                assert_eq!(*note as usize, octave as usize * 12 + i);
            }
        }
    }

    #[test]
    fn drum_mode_replaces_only_low_octave() {
        for octave in 0..=MAX_OCTAVE {
            let plain = build(octave, false);
            let drums = build(octave, true);
            assert_eq!(drums[..DRUM_KEY_COUNT], DRUM_NOTES);
            assert_eq!(drums[DRUM_KEY_COUNT..], plain[DRUM_KEY_COUNT..]);
        }
    }

    #[test]
    fn highest_key_stays_in_midi_range() {
        let table = build(MAX_OCTAVE, false);
        assert_eq!(table[Key::C3.index()], 120);
    }

    #[test]
    fn named_keys_match_positions() {
        let table = build(4, false);
        assert_eq!(table[Key::C1.index()], 48);
        assert_eq!(table[Key::C2.index()], 60);
        assert_eq!(Key::C3.index(), KEY_COUNT - 1);
    }

    #[test]
    #[should_panic]
    fn rejects_octave_above_range() {
        build(MAX_OCTAVE + 1, false);
    }
}
