pub mod renderer;

pub use renderer::{CELL_WIDTH, GridLayout, Renderer, Screen};
