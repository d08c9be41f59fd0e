use common::models::Signal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rendered image for exactly one signal. Handed by value to the platform
/// adapter, which drops it once delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub trait SignalRenderer: Send + Sync {
    fn render(&self, signal: &Signal) -> Result<Artifact, RenderError>;
}
