mod keyboard;
mod lights;
mod midi_out;
mod note_map;
mod session;
mod settings;
mod translator;

use std::{
    error::Error,
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::Parser;
use keyboard::{InputChange, KeyboardController};
use lights::LightPanel;
use midi_out::MidiOut;
use session::Session;
use settings::Settings;
use translator::{MidiSink, TranslateContext};

#[derive(Parser, Debug)]
#[clap(
    name = "rb3-keys-midi",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
struct Args {
    #[clap(short, long, help = "Settings file (see keyboard.yml)")]
    config: Option<PathBuf>,

    #[clap(short, long, help = "Part of the MIDI output port name")]
    port: Option<String>,

    #[clap(long, help = "List MIDI output ports and exit")]
    list_ports: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(port) = args.port {
        settings.midi.port = port;
    }

    if args.list_ports {
        for name in midi_out::list_ports(&settings.midi.client_name)? {
            println!("{name}");
        }
        return Ok(());
    }

    log::debug!("Running with settings: {settings:?}");

    let mut midi = MidiOut::connect(&settings.midi.client_name, &settings.midi.port)?;
    let mut keyboard = KeyboardController::connect(&settings.controller)?;

    let mut session = settings.session.to_session();
    session.output_enabled = true;
    log::info!(
        "Sending to \"{}\": octave {}, program {}, pedal {:?}, drums {}",
        midi.port_name(),
        session.octave,
        session.program + 1,
        session.pedal_mode,
        session.drum_mode
    );

    let step = settings.lights.step();
    let mut panel = LightPanel::new();
    let mut next_step = Instant::now() + step;

    loop {
        if let Some(change) = keyboard.poll_once()? {
            let was_animating = panel.is_animating();
            handle_input(&change, &mut session, &mut panel, &mut midi);
            if !was_animating && panel.is_animating() {
                next_step = Instant::now() + step;
            }
        }

        update_lights(&mut panel, &session, &mut next_step, step);
    }
}

/// Run one tick: session controls, then MIDI for the state change.
fn handle_input<S: MidiSink>(
    change: &InputChange,
    session: &mut Session,
    panel: &mut LightPanel,
    sink: &mut S,
) {
    let InputChange { previous, current } = change;

    if let Some(animation) = session.apply_controls(previous, current) {
        panel.play(animation);
    }

    let notes = note_map::build(session.octave, session.drum_mode);
    let context = TranslateContext {
        pedal_mode: session.pedal_mode,
        program: session.program,
        drum_mode: session.drum_mode,
    };
    let translation = translator::translate(
        previous,
        current,
        &notes,
        context,
        &mut session.previous_program,
    );
    if !translation.is_empty() {
        translator::dispatch(&translation, sink);
    }
}

/// Advance the animation on its own clock, or mirror the session when idle.
fn update_lights(
    panel: &mut LightPanel,
    session: &Session,
    next_step: &mut Instant,
    step: Duration,
) {
    let mut changed = false;

    if panel.is_animating() {
        let now = Instant::now();
        if now >= *next_step {
            changed = panel.step();
            *next_step = now + step;
        }
    }

    if !panel.is_animating() {
        changed |= panel.mirror(session.lights());
    }

    if changed {
        log::info!("lights {} ({:04b})", panel.lights(), panel.lights().bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::InputState;
    use crate::lights::Animation;
    use crate::translator::MidiEvent;

    #[derive(Default)]
    struct Recorder {
        events: Vec<MidiEvent>,
        all_notes_off: usize,
    }

    impl MidiSink for Recorder {
        fn send(&mut self, event: &MidiEvent) {
            self.events.push(*event);
        }

        fn all_notes_off(&mut self) {
            self.all_notes_off += 1;
        }
    }

    fn tick(
        previous: &InputState,
        current: &InputState,
        session: &mut Session,
        panel: &mut LightPanel,
    ) -> Vec<MidiEvent> {
        let mut recorder = Recorder::default();
        let change = InputChange {
            previous: previous.clone(),
            current: current.clone(),
        };
        handle_input(&change, session, panel, &mut recorder);
        recorder.events
    }

    #[test]
    fn first_tick_sends_initial_program() {
        let mut session = Session::default();
        let mut panel = LightPanel::new();
        let idle = InputState::default();

        assert_eq!(
            tick(&idle, &idle, &mut session, &mut panel),
            vec![MidiEvent::ProgramChange {
                channel: 0,
                program: 0
            }]
        );
        assert!(tick(&idle, &idle, &mut session, &mut panel).is_empty());
    }

    #[test]
    fn program_button_changes_program_on_same_tick() {
        let mut session = Session {
            previous_program: 0,
            ..Session::default()
        };
        let mut panel = LightPanel::new();
        let idle = InputState::default();
        let y = InputState {
            btn_y: true,
            ..InputState::default()
        };

        assert_eq!(
            tick(&idle, &y, &mut session, &mut panel),
            vec![MidiEvent::ProgramChange {
                channel: 0,
                program: 1
            }]
        );
        assert_eq!(
            panel.state(),
            lights::SequencerState::Animating {
                animation: Animation::Increase,
                step: 0
            }
        );
        assert!(tick(&y, &idle, &mut session, &mut panel).is_empty());
    }

    #[test]
    fn octave_button_moves_following_notes() {
        let mut session = Session {
            previous_program: 0,
            ..Session::default()
        };
        let mut panel = LightPanel::new();
        let idle = InputState::default();
        let b = InputState {
            btn_b: true,
            ..InputState::default()
        };
        tick(&idle, &b, &mut session, &mut panel);

        let mut key = InputState::default();
        key.key[0] = true;
        key.velocity[0] = 100;
        assert_eq!(
            tick(&idle, &key, &mut session, &mut panel),
            vec![MidiEvent::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100
            }]
        );
    }

    #[test]
    fn back_guide_start_silences_device() {
        let mut session = Session {
            previous_program: 0,
            ..Session::default()
        };
        let mut panel = LightPanel::new();
        let panic = InputState {
            btn_back: true,
            btn_guide: true,
            btn_start: true,
            ..InputState::default()
        };
        let change = InputChange {
            previous: panic.clone(),
            current: panic,
        };

        let mut recorder = Recorder::default();
        handle_input(&change, &mut session, &mut panel, &mut recorder);
        assert_eq!(recorder.all_notes_off, 1);
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn idle_lights_mirror_session() {
        let session = Session {
            output_enabled: true,
            drum_mode: true,
            ..Session::default()
        };
        let mut panel = LightPanel::new();
        let mut next_step = Instant::now();

        update_lights(&mut panel, &session, &mut next_step, Duration::from_millis(100));
        assert_eq!(panel.lights().bits(), 0b1001);
    }

    #[test]
    fn animation_waits_for_its_clock() {
        let session = Session::default();
        let mut panel = LightPanel::new();
        panel.play(Animation::Increase);
        let mut next_step = Instant::now() + Duration::from_secs(60);

        update_lights(&mut panel, &session, &mut next_step, Duration::from_secs(60));
        assert_eq!(panel.lights().bits(), 0b0000);

        let mut next_step = Instant::now();
        update_lights(&mut panel, &session, &mut next_step, Duration::from_secs(60));
        assert_eq!(panel.lights().bits(), 0b1000);
    }
}
