//! The four MIDI indicator lights and the short animations played on them.
//!
//! While idle the lights mirror the session (output enabled, foot
//! controller, channel volume, drum mode). An animation takes them over
//! for a few timer steps and then hands them back.

use std::fmt;

/// Number of indicator lights.
pub const LIGHT_COUNT: usize = 4;

/// On/off state of each indicator, left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightState(pub [bool; LIGHT_COUNT]);

impl LightState {
    pub const OFF: LightState = LightState([false; LIGHT_COUNT]);

    /// Build from a 4-bit pattern where bit 3 is the leftmost light.
    pub const fn from_bits(bits: u8) -> Self {
        LightState([
            bits & 0b1000 != 0,
            bits & 0b0100 != 0,
            bits & 0b0010 != 0,
            bits & 0b0001 != 0,
        ])
    }

    pub fn bits(&self) -> u8 {
        self.0
            .iter()
            .fold(0, |acc, lit| (acc << 1) | u8::from(*lit))
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lit in self.0 {
            f.write_str(if lit { "●" } else { "○" })?;
        }
        Ok(())
    }
}

/// Scripted light animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Increase,
    Decrease,
    Reset,
}

const INCREASE: [u8; 5] = [0b1000, 0b1100, 0b1110, 0b1111, 0b1111];
const DECREASE: [u8; 5] = [0b1111, 0b1110, 0b1100, 0b1000, 0b1000];
const RESET: [u8; 4] = [0b0110, 0b0110, 0b1001, 0b1001];
const END: [u8; 2] = [0b0000, 0b0000];

impl Animation {
    fn frames(self) -> &'static [u8] {
        match self {
            Animation::Increase => &INCREASE,
            Animation::Decrease => &DECREASE,
            Animation::Reset => &RESET,
        }
    }

    /// Pattern shown on `step`, including the two trailing off steps.
    fn frame(self, step: usize) -> Option<LightState> {
        let frames = self.frames();
        frames
            .get(step)
            .or_else(|| END.get(step - frames.len()))
            .map(|bits| LightState::from_bits(*bits))
    }

    /// Number of timer steps until the animation returns to idle.
    pub fn len(self) -> usize {
        self.frames().len() + END.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    /// `step` is the index of the next frame to show.
    Animating { animation: Animation, step: usize },
}

/// Owner of the indicator lights.
///
/// Two writers share the lights: [`LightPanel::mirror`] (the session) and
/// [`LightPanel::step`] (the animation timer). Mirroring is ignored while
/// an animation runs.
#[derive(Debug, Clone)]
pub struct LightPanel {
    lights: LightState,
    state: SequencerState,
}

impl Default for LightPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl LightPanel {
    pub fn new() -> Self {
        Self {
            lights: LightState::OFF,
            state: SequencerState::Idle,
        }
    }

    pub fn lights(&self) -> LightState {
        self.lights
    }

    #[allow(dead_code)]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, SequencerState::Animating { .. })
    }

    /// Start `animation` from its first frame, replacing any running one.
    ///
    /// The lights keep their current pattern until the next [`step`](Self::step).
    pub fn play(&mut self, animation: Animation) {
        self.state = SequencerState::Animating { animation, step: 0 };
    }

    /// Advance one timer step. Returns true if the lights changed.
    pub fn step(&mut self) -> bool {
        let SequencerState::Animating { animation, step } = self.state else {
            return false;
        };

        let before = self.lights;
        if let Some(frame) = animation.frame(step) {
            self.lights = frame;
        }

        self.state = if step + 1 >= animation.len() {
            SequencerState::Idle
        } else {
            SequencerState::Animating {
                animation,
                step: step + 1,
            }
        };

        before != self.lights
    }

    /// Show session state. No-op while animating. Returns true if the
    /// lights changed.
    pub fn mirror(&mut self, session_lights: LightState) -> bool {
        if self.is_animating() || self.lights == session_lights {
            return false;
        }
        self.lights = session_lights;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(panel: &mut LightPanel, steps: usize) -> Vec<u8> {
        (0..steps)
            .map(|_| {
                panel.step();
                panel.lights().bits()
            })
            .collect()
    }

    #[test]
    fn increase_runs_to_idle() {
        let mut panel = LightPanel::new();
        panel.play(Animation::Increase);

        let seen = run(&mut panel, 7);
        assert_eq!(
            seen,
            vec![0b1000, 0b1100, 0b1110, 0b1111, 0b1111, 0b0000, 0b0000]
        );
        assert_eq!(panel.state(), SequencerState::Idle);
        assert_eq!(panel.lights(), LightState::OFF);
    }

    #[test]
    fn decrease_runs_to_idle() {
        let mut panel = LightPanel::new();
        panel.play(Animation::Decrease);

        let seen = run(&mut panel, 7);
        assert_eq!(
            seen,
            vec![0b1111, 0b1110, 0b1100, 0b1000, 0b1000, 0b0000, 0b0000]
        );
        assert!(!panel.is_animating());
    }

    #[test]
    fn reset_runs_to_idle() {
        let mut panel = LightPanel::new();
        panel.play(Animation::Reset);

        let seen = run(&mut panel, 6);
        assert_eq!(seen, vec![0b0110, 0b0110, 0b1001, 0b1001, 0b0000, 0b0000]);
        assert!(!panel.is_animating());
    }

    #[test]
    fn idle_step_does_nothing() {
        let mut panel = LightPanel::new();
        panel.mirror(LightState::from_bits(0b1001));
        assert!(!panel.step());
        assert_eq!(panel.lights().bits(), 0b1001);
    }

    #[test]
    fn mirror_is_blocked_while_animating() {
        let mut panel = LightPanel::new();
        panel.mirror(LightState::from_bits(0b1000));
        panel.play(Animation::Reset);

        // Play alone leaves the lights untouched.
        assert_eq!(panel.lights().bits(), 0b1000);
        assert!(!panel.mirror(LightState::from_bits(0b0001)));
        panel.step();
        assert_eq!(panel.lights().bits(), 0b0110);

        run(&mut panel, 5);
        assert!(panel.mirror(LightState::from_bits(0b0001)));
        assert_eq!(panel.lights().bits(), 0b0001);
    }

    #[test]
    fn retrigger_restarts_from_first_frame() {
        let mut panel = LightPanel::new();
        panel.play(Animation::Increase);
        run(&mut panel, 3);

        panel.play(Animation::Decrease);
        assert_eq!(
            panel.state(),
            SequencerState::Animating {
                animation: Animation::Decrease,
                step: 0
            }
        );
        panel.step();
        assert_eq!(panel.lights().bits(), 0b1111);
    }

    #[test]
    fn renders_as_dots() {
        assert_eq!(LightState::from_bits(0b1010).to_string(), "●○●○");
    }
}
