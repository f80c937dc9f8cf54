use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid pose recording: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no image frames found in {0}")]
    NoFrames(PathBuf),

    #[error("pose recording contains no frames")]
    EmptyRecording,

    #[error("viewer failed: {0}")]
    Gui(String),
}
