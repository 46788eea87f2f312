pub mod canvas;
pub mod color;
pub mod markup;
pub mod painter;
pub mod text;

pub use canvas::{Canvas, ClipRect};
pub use color::Color;
pub use text::{FontdueText, TextMeasure, TextRenderer, TextSize};
