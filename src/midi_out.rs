use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use midly::{
    live::{LiveEvent, SystemRealtime},
    num::{u4, u7},
    MidiMessage,
};
use std::fmt;

use crate::translator::{MidiEvent, MidiSink};

const CHANNEL_COUNT: u8 = 16;
const ALL_NOTES_OFF_CC: u8 = 123;
const CONNECTION_NAME: &str = "rb3-keys-midi-out";

/// Connection to one MIDI output port.
pub struct MidiOut {
    connection: MidiOutputConnection,
    port_name: String,
    scratch: Vec<u8>,
}

impl MidiOut {
    /// Connect to the output port picked by [`pick_port`].
    pub fn connect(client_name: &str, port_hint: &str) -> Result<Self, MidiOutError> {
        let midi_out = MidiOutput::new(client_name).map_err(|err| MidiOutError::NoBackend {
            client: client_name.to_string(),
            reason: err.to_string(),
        })?;
        let ports = midi_out.ports();
        let names = port_names(&midi_out, &ports);

        let index = pick_port(&names, port_hint).ok_or_else(|| MidiOutError::NoMatchingPort {
            hint: port_hint.to_string(),
            available: names.clone(),
        })?;
        let port_name = names[index].clone();

        let connection = midi_out
            .connect(&ports[index], CONNECTION_NAME)
            .map_err(|err| MidiOutError::Connect {
                port: port_name.clone(),
                reason: err.to_string(),
            })?;

        log::info!("MIDI output connected to \"{port_name}\"");

        Ok(Self {
            connection,
            port_name,
            scratch: Vec::with_capacity(3),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send_raw(&mut self, what: &dyn fmt::Debug) {
        if let Err(err) = self.connection.send(&self.scratch) {
            log::warn!(
                "midi out ({}): failed to send {:?}: {}",
                self.port_name,
                what,
                err
            );
        }
    }
}

impl MidiSink for MidiOut {
    fn send(&mut self, event: &MidiEvent) {
        self.scratch.clear();
        encode(event, &mut self.scratch);
        log::debug!("-> {event:?} {:02X?}", self.scratch);
        self.send_raw(event);
    }

    fn all_notes_off(&mut self) {
        log::info!("all notes off");
        for channel in 0..CHANNEL_COUNT {
            let event = MidiEvent::ControlChange {
                channel,
                controller: ALL_NOTES_OFF_CC,
                value: 0,
            };
            self.scratch.clear();
            encode(&event, &mut self.scratch);
            self.send_raw(&event);
        }
    }
}

impl Drop for MidiOut {
    fn drop(&mut self) {
        self.all_notes_off();
    }
}

/// Names of every MIDI output port currently available.
pub fn list_ports(client_name: &str) -> Result<Vec<String>, MidiOutError> {
    let midi_out = MidiOutput::new(client_name).map_err(|err| MidiOutError::NoBackend {
        client: client_name.to_string(),
        reason: err.to_string(),
    })?;
    Ok(port_names(&midi_out, &midi_out.ports()))
}

fn port_names(midi_out: &MidiOutput, ports: &[MidiOutputPort]) -> Vec<String> {
    ports
        .iter()
        .map(|port| midi_out.port_name(port).unwrap_or_default())
        .collect()
}

/// Index of the port to open.
///
/// An exact name match wins over a partial one; partial matches ignore
/// case. A blank hint takes the first port.
pub fn pick_port(names: &[String], hint: &str) -> Option<usize> {
    let hint = hint.trim();
    if hint.is_empty() {
        return (!names.is_empty()).then_some(0);
    }
    if let Some(index) = names.iter().position(|name| name == hint) {
        return Some(index);
    }
    let hint = hint.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&hint))
}

fn live_event(event: &MidiEvent) -> LiveEvent<'static> {
    let midi = |channel: u8, message| LiveEvent::Midi {
        channel: u4::new(channel),
        message,
    };

    match *event {
        MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        } => midi(
            channel,
            MidiMessage::NoteOn {
                key: u7::new(note),
                vel: u7::new(velocity),
            },
        ),
        MidiEvent::NoteOff {
            channel,
            note,
            velocity,
        } => midi(
            channel,
            MidiMessage::NoteOff {
                key: u7::new(note),
                vel: u7::new(velocity),
            },
        ),
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } => midi(
            channel,
            MidiMessage::Controller {
                controller: u7::new(controller),
                value: u7::new(value),
            },
        ),
        MidiEvent::ProgramChange { channel, program } => midi(
            channel,
            MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        ),
        MidiEvent::Start => LiveEvent::Realtime(SystemRealtime::Start),
        MidiEvent::Continue => LiveEvent::Realtime(SystemRealtime::Continue),
        MidiEvent::Stop => LiveEvent::Realtime(SystemRealtime::Stop),
    }
}

/// Append the wire bytes for `event` to `buf`.
pub fn encode(event: &MidiEvent, buf: &mut Vec<u8>) {
    // Writing into a Vec cannot fail.
    let _ = live_event(event).write_std(buf);
}

#[derive(Debug)]
pub enum MidiOutError {
    /// The platform MIDI layer refused to create a client.
    NoBackend { client: String, reason: String },
    NoMatchingPort { hint: String, available: Vec<String> },
    Connect { port: String, reason: String },
}

impl fmt::Display for MidiOutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiOutError::NoBackend { client, reason } => {
                write!(f, "MIDI client \"{client}\" unavailable: {reason}")
            }
            MidiOutError::NoMatchingPort { hint, available } if available.is_empty() => {
                write!(f, "no MIDI outputs to choose from (wanted \"{hint}\")")
            }
            MidiOutError::NoMatchingPort { hint, available } => write!(
                f,
                "\"{hint}\" matches none of the MIDI outputs: {}",
                available.join(", ")
            ),
            MidiOutError::Connect { port, reason } => {
                write!(f, "could not open MIDI output \"{port}\": {reason}")
            }
        }
    }
}

impl std::error::Error for MidiOutError {}
