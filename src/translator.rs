//! Turns the difference between two keyboard snapshots into MIDI.

use crate::keyboard::InputState;
use crate::note_map::{self, NoteTable, PERCUSSION_CHANNEL};
use crate::session::{PedalMode, MAX_PROGRAM};

/// Sustain pedal controller number.
pub const SUSTAIN_CC: u8 = 64;

const MAIN_CHANNEL: u8 = 0;
const DATA_MAX: u8 = 0x7F;

/// One MIDI message to send. Channels are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    Start,
    Continue,
    Stop,
}

/// Output of one translation pass.
///
/// `all_notes_off` is a direct command to the device and goes out before
/// `events`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub all_notes_off: bool,
    pub events: Vec<MidiEvent>,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        !self.all_notes_off && self.events.is_empty()
    }
}

/// Session values the translator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateContext {
    pub pedal_mode: PedalMode,
    pub program: u8,
    pub drum_mode: bool,
}

/// Where translated MIDI goes.
pub trait MidiSink {
    fn send(&mut self, event: &MidiEvent);
    fn all_notes_off(&mut self);
}

fn rose(previous: bool, current: bool) -> bool {
    current && !previous
}

/// Compare `previous` with `current` and produce the MIDI needed to bring
/// the receiver up to date.
///
/// Events come out in a fixed order: transport (Stop, Continue, Start),
/// program change, notes by ascending key, sustain, analog pedal. Nothing
/// is sent for values that did not change, except the program, which is
/// compared against `previous_program` and written back once sent.
///
/// Panics if the program, a velocity of a newly pressed key or the analog
/// pedal is outside 0..=127.
pub fn translate(
    previous: &InputState,
    current: &InputState,
    notes: &NoteTable,
    context: TranslateContext,
    previous_program: &mut u8,
) -> Translation {
    let mut out = Translation {
        all_notes_off: current.btn_back && current.btn_guide && current.btn_start,
        events: Vec::new(),
    };

    for (was, is, event) in [
        (previous.btn_back, current.btn_back, MidiEvent::Stop),
        (previous.btn_guide, current.btn_guide, MidiEvent::Continue),
        (previous.btn_start, current.btn_start, MidiEvent::Start),
    ] {
        if rose(was, is) {
            out.events.push(event);
        }
    }

    if context.program != *previous_program {
        assert!(
            context.program <= MAX_PROGRAM,
            "program {} out of range",
            context.program
        );
        out.events.push(MidiEvent::ProgramChange {
            channel: MAIN_CHANNEL,
            program: context.program,
        });
        *previous_program = context.program;
    }

    for (i, (was, is)) in previous.key.iter().zip(current.key.iter()).enumerate() {
        if was == is {
            continue;
        }
        let channel = if note_map::is_drum_key(i, context.drum_mode) {
            PERCUSSION_CHANNEL
        } else {
            MAIN_CHANNEL
        };
        let note = notes[i];
        out.events.push(if *is {
            let velocity = current.velocity[i];
            assert!(velocity <= DATA_MAX, "key {i} velocity {velocity} out of range");
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            }
        } else {
            MidiEvent::NoteOff {
                channel,
                note,
                velocity: 0,
            }
        });
    }

    if current.pedal_digital != previous.pedal_digital {
        out.events.push(MidiEvent::ControlChange {
            channel: MAIN_CHANNEL,
            controller: SUSTAIN_CC,
            value: if current.pedal_digital { DATA_MAX } else { 0 },
        });
    }

    if current.pedal_analog != previous.pedal_analog {
        assert!(
            current.pedal_analog <= DATA_MAX,
            "pedal value {} out of range",
            current.pedal_analog
        );
        out.events.push(MidiEvent::ControlChange {
            channel: MAIN_CHANNEL,
            controller: context.pedal_mode.controller(),
            value: current.pedal_analog,
        });
    }

    out
}

/// Deliver a translation to `sink`, all-notes-off first.
pub fn dispatch<S: MidiSink + ?Sized>(translation: &Translation, sink: &mut S) {
    if translation.all_notes_off {
        sink.all_notes_off();
    }
    for event in &translation.events {
        sink.send(event);
    }
}
