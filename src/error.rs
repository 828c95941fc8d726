use std::path::PathBuf;

use thiserror::Error;

/// Library error type for slideshow startup.
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest parsed but lists no artwork.
    #[error("manifest {} contains no artwork entries", .0.display())]
    EmptyManifest(PathBuf),

    /// An entry carries an empty image locator.
    #[error("manifest entry {index} has an empty src")]
    EmptyLocator { index: usize },

    /// The simulated clock cannot reach the requested horizon.
    #[error("simulation horizon {0:?} is out of range")]
    HorizonTooLong(std::time::Duration),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON manifest error.
    #[error(transparent)]
    Manifest(#[from] serde_json::Error),
}
