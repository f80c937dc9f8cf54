use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::DynamicImage;

use crate::overlay::Facing;

// make SharedState an alias for a Mutex protected struct State
pub type SharedState = Arc<Mutex<State>>;

/// Data shared between the capture thread, the analysis worker and the viewer.
#[derive(Default)]
pub struct State {
    pub fps: Option<f32>,
    pub resolution: Option<(u32, u32)>,
    pub facing: Facing,
    // latest preview frame, shown underneath the overlay
    pub image: Option<Arc<DynamicImage>>,
    // bumped whenever `image` changes so the viewer only re-uploads new frames
    pub image_generation: u64,
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub poses_drawn: u64,
    pub detection_failures: u64,
}

impl State {
    pub fn set_image(&mut self, image: Arc<DynamicImage>) {
        self.resolution = Some((image.width(), image.height()));
        self.image = Some(image);
        self.image_generation += 1;
    }
}

/// Fixed length window of values with their timestamps (microseconds).
#[derive(Debug, Clone)]
pub struct TimeSeries {
    data: VecDeque<f32>,
    timestamp: VecDeque<u128>,
    max_length: usize,
}

impl TimeSeries {
    pub fn new(max_length: usize) -> Self {
        Self {
            data: VecDeque::new(),
            timestamp: VecDeque::new(),
            max_length,
        }
    }

    pub fn push(&mut self, value: f32, timestamp: u128) {
        self.data.push_back(value);
        self.timestamp.push_back(timestamp);

        if self.data.len() > self.max_length {
            self.data.pop_front();
            self.timestamp.pop_front();
        }
    }

    /// Mean of the window, `None` while it is empty.
    pub fn get_mean(&self) -> Option<f32> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().sum::<f32>() / self.data.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<u128> {
        self.timestamp.back().copied()
    }
}

/// Smoothed frames per second over the last few frames.
pub struct FpsCounter {
    started: Instant,
    last_frame: Option<Instant>,
    series: TimeSeries,
}

impl FpsCounter {
    pub fn new(window: usize) -> Self {
        Self {
            started: Instant::now(),
            last_frame: None,
            series: TimeSeries::new(window),
        }
    }

    /// Records a frame at `now` and returns the rounded mean fps, if known.
    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        if let Some(last) = self.last_frame {
            let delta = now.duration_since(last).as_secs_f32();
            if delta > 0.0 {
                let timestamp = now.duration_since(self.started).as_micros();
                self.series.push(1.0 / delta, timestamp);
            }
        }
        self.last_frame = Some(now);

        self.series.get_mean().map(f32::round)
    }

    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }
}
