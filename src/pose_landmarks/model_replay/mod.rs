use std::fs;
use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::pose_landmarks::{
    DetectionError, Pose, PoseDetectionModel, PoseLandmark, PoseLandmarkType,
};
use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordedLandmark {
    #[serde(rename = "type")]
    landmark_type: PoseLandmarkType,
    x: f32,
    y: f32,
    #[serde(default = "default_likelihood")]
    likelihood: f32,
}

fn default_likelihood() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordedPose {
    landmarks: Vec<RecordedLandmark>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Recording {
    // null entries are frames in which detection failed
    frames: Vec<Option<RecordedPose>>,
}

/// Replays pose results recorded from a real model, one per `run` call.
pub struct ReplayPoseModel {
    frames: Vec<Option<Pose>>,
    next: usize,
    looping: bool,
}

impl ReplayPoseModel {
    pub fn from_json(json: &str, looping: bool) -> Result<Self, Error> {
        let recording: Recording = serde_json::from_str(json)?;
        if recording.frames.is_empty() {
            return Err(Error::EmptyRecording);
        }

        let frames = recording
            .frames
            .into_iter()
            .map(|frame| {
                frame.map(|recorded| {
                    Pose::from_landmarks(recorded.landmarks.into_iter().map(|l| {
                        PoseLandmark::new(l.landmark_type, l.x, l.y, l.likelihood)
                    }))
                })
            })
            .collect();

        Ok(Self {
            frames,
            next: 0,
            looping,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, looping)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseDetectionModel for ReplayPoseModel {
    fn run(&mut self, _image: &DynamicImage) -> Result<Pose, DetectionError> {
        if self.next >= self.frames.len() {
            if !self.looping {
                return Err(DetectionError::Exhausted);
            }
            self.next = 0;
        }

        let frame = self.frames[self.next].clone();
        self.next += 1;

        frame.ok_or(DetectionError::NoPose)
    }
}
