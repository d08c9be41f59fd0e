pub mod artifact;
pub mod card;
mod font;

pub use artifact::{Artifact, RenderError, SignalRenderer};
pub use card::CardRenderer;
