mod input_state;
mod keyboard_controller;

pub use input_state::InputState;
pub use keyboard_controller::{InputChange, KeyboardController};
