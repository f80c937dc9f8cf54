use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::overlay::Facing;

/// Draws a pose skeleton over a frame feed.
#[derive(Debug, Clone, Parser)]
#[command(name = "posetracking", version, about)]
pub struct Config {
    /// Directory of preview frames, played in file name order
    #[arg(long)]
    pub frames: PathBuf,

    /// Recorded pose model results (JSON)
    #[arg(long)]
    pub poses: PathBuf,

    /// Which way the camera faced, front mirrors the overlay
    #[arg(long, value_enum, default_value_t = Facing::Back)]
    pub facing: Facing,

    /// Frames per second for the preview feed
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Start over when the frames or poses run out
    #[arg(long = "loop")]
    pub looping: bool,

    /// Write annotated frames to this directory instead of opening a window
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Surface width for rendered frames
    #[arg(long, default_value_t = 1080)]
    pub surface_width: u32,

    /// Surface height for rendered frames
    #[arg(long, default_value_t = 2280)]
    pub surface_height: u32,
}

impl Config {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}
