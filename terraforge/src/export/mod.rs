//! Mesh exporters.
//!
//! Two formats per job: an ASCII STL solid for printing and a binary glTF
//! (GLB) scene for viewing. The GLB exporter renders no pixels itself but
//! needs an image encoder for texture baking; that dependency is isolated
//! behind the [`RenderContext`] seam so the pipeline can run headless.

mod glb;
mod headless;
mod stl;

pub use glb::{export_glb, TextureImage};
pub use headless::{HeadlessContext, RenderContext};
pub use stl::export_stl;

use thiserror::Error;

/// Errors raised during mesh-to-file conversion.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Scene JSON serialization failed.
    #[error("failed to serialize scene: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image encoding failed.
    #[error("failed to encode image: {0}")]
    Encoding(String),
}
