pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod frames;
pub mod overlay;
pub mod pose_graphic;
pub mod pose_landmarks;
pub mod render;
pub mod utils;

pub use error::Error;
