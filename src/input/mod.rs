pub mod handler;

pub use handler::{InputHandler, KeyAction, NUDGE_STEP};
