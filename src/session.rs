use serde::Deserialize;

use crate::keyboard::InputState;
use crate::lights::{Animation, LightState};
use crate::note_map::MAX_OCTAVE;

pub const MAX_PROGRAM: u8 = 127;
pub const DEFAULT_OCTAVE: u8 = 4;

/// Which controller the analog pedal is sent as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedalMode {
    #[default]
    Expression,
    ChannelVolume,
    FootController,
}

impl PedalMode {
    /// MIDI controller number for this mode.
    pub fn controller(self) -> u8 {
        match self {
            PedalMode::Expression => 11,
            PedalMode::ChannelVolume => 7,
            PedalMode::FootController => 4,
        }
    }
}

/// Values the host keeps across ticks.
///
/// `octave`, `program`, `pedal_mode` and `drum_mode` are written by
/// [`Session::apply_controls`]; `previous_program` is written only by the
/// translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub octave: u8,
    pub program: u8,
    pub pedal_mode: PedalMode,
    pub drum_mode: bool,
    pub previous_program: u8,
    pub output_enabled: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            octave: DEFAULT_OCTAVE,
            program: 0,
            pedal_mode: PedalMode::Expression,
            drum_mode: false,
            previous_program: 1,
            output_enabled: false,
        }
    }
}

fn rose(previous: bool, current: bool) -> bool {
    current && !previous
}

/// What a pair of up/down buttons asked for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
    Reset,
}

impl Step {
    fn from_buttons(
        (prev_down, down): (bool, bool),
        (prev_up, up): (bool, bool),
    ) -> Option<Self> {
        if !rose(prev_down, down) && !rose(prev_up, up) {
            return None;
        }
        match (down, up) {
            (true, true) => Some(Step::Reset),
            (true, false) => Some(Step::Down),
            (false, true) => Some(Step::Up),
            (false, false) => None,
        }
    }

    fn animation(self) -> Animation {
        match self {
            Step::Up => Animation::Increase,
            Step::Down => Animation::Decrease,
            Step::Reset => Animation::Reset,
        }
    }

    fn apply(self, value: u8, reset_to: u8, max: u8) -> u8 {
        match self {
            Step::Up => value.saturating_add(1).min(max),
            Step::Down => value.saturating_sub(1),
            Step::Reset => reset_to,
        }
    }
}

impl Session {
    /// Apply the keyboard's own controls (D-pad, face buttons) for one tick.
    ///
    /// * D-pad up toggles drum mode.
    /// * D-pad left/down/right pick expression/channel volume/foot controller.
    /// * A/Y step the program down/up, both together reset it to 0.
    /// * X/B step the octave down/up, both together reset it to 4.
    ///
    /// Only rising edges act. Returns the animation to play, if any.
    pub fn apply_controls(
        &mut self,
        previous: &InputState,
        current: &InputState,
    ) -> Option<Animation> {
        if rose(previous.dpad_up, current.dpad_up) {
            self.drum_mode = !self.drum_mode;
            log::info!(
                "drum mode {}",
                if self.drum_mode { "on" } else { "off" }
            );
        }

        // Right beats down beats left when a diagonal lands on one tick.
        let pedal_mode = if rose(previous.dpad_right, current.dpad_right) {
            Some(PedalMode::FootController)
        } else if rose(previous.dpad_down, current.dpad_down) {
            Some(PedalMode::ChannelVolume)
        } else if rose(previous.dpad_left, current.dpad_left) {
            Some(PedalMode::Expression)
        } else {
            None
        };
        if let Some(mode) = pedal_mode {
            self.pedal_mode = mode;
            log::info!("pedal mode {mode:?} (CC {})", mode.controller());
        }

        let mut animation = None;

        if let Some(step) = Step::from_buttons(
            (previous.btn_a, current.btn_a),
            (previous.btn_y, current.btn_y),
        ) {
            self.program = step.apply(self.program, 0, MAX_PROGRAM);
            animation = Some(step.animation());
            log::info!("program {}", self.program + 1);
        }

        if let Some(step) = Step::from_buttons(
            (previous.btn_x, current.btn_x),
            (previous.btn_b, current.btn_b),
        ) {
            self.octave = step.apply(self.octave, DEFAULT_OCTAVE, MAX_OCTAVE);
            animation = Some(step.animation());
            log::info!("octave {}", self.octave);
        }

        animation
    }

    /// Lights shown while no animation is running.
    pub fn lights(&self) -> LightState {
        LightState([
            self.output_enabled,
            self.pedal_mode == PedalMode::FootController,
            self.pedal_mode == PedalMode::ChannelVolume,
            self.drum_mode,
        ])
    }
}
