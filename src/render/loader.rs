//! Request-driven background image loader.
//! Receives decode jobs (entry index + path + surface size), decodes and
//! downsizes off-thread, and returns RGBA8 frames without blocking the
//! render loop.
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::render::layout::compute_scaled_size;

/// Message sent to the background loader thread.
#[derive(Debug)]
pub enum LoaderMsg {
    Decode {
        index: usize,
        path: PathBuf,
        /// Surface size the image will be fitted into.
        target: (u32, u32),
        max_texture_dim: u32,
    },
    Quit,
}

/// An image decoded on the CPU and ready for GPU upload.
#[derive(Debug)]
pub struct PreparedImage {
    pub index: usize,
    pub path: PathBuf,
    pub size: (u32, u32),
    /// RGBA8 pixel buffer.
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Ready(PreparedImage),
    Failed {
        index: usize,
        path: PathBuf,
        error: String,
    },
}

impl LoadOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Ready(img) => img.index,
            Self::Failed { index, .. } => *index,
        }
    }
}

/// Decode `path` and shrink it to fit `target` (never enlarging).
pub fn decode_for_display(
    path: &Path,
    target: (u32, u32),
    max_texture_dim: u32,
) -> Result<((u32, u32), Vec<u8>)> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;

    let (w, h) = compute_scaled_size(
        img.width(),
        img.height(),
        target.0,
        target.1,
        max_texture_dim,
    );
    let img = if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };
    Ok(((w, h), img.to_rgba8().into_vec()))
}

/// Spawn the request-driven loader. It exits on `Quit` or when either channel
/// closes.
pub fn spawn_loader(rx: Receiver<LoaderMsg>, tx: Sender<LoadOutcome>) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            let (index, path, target, max_texture_dim) = match msg {
                LoaderMsg::Quit => break,
                LoaderMsg::Decode {
                    index,
                    path,
                    target,
                    max_texture_dim,
                } => (index, path, target, max_texture_dim),
            };
            let outcome = match decode_for_display(&path, target, max_texture_dim) {
                Ok((size, pixels)) => {
                    debug!(index, path = %path.display(), ?size, "artwork decoded");
                    LoadOutcome::Ready(PreparedImage {
                        index,
                        path,
                        size,
                        pixels,
                    })
                }
                Err(err) => {
                    warn!(index, path = %path.display(), error = ?err, "artwork failed to load");
                    LoadOutcome::Failed {
                        index,
                        path,
                        error: format!("{err:#}"),
                    }
                }
            };
            if tx.send(outcome).is_err() {
                break;
            }
        }
        debug!("loader thread exiting");
    })
}
