pub mod model_replay;

use image::DynamicImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NUM_LANDMARKS: usize = 33;

/// The 33 body joints reported by BlazePose style models, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseLandmarkType {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    LeftMouth,
    RightMouth,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmarkType {
    pub const ALL: [PoseLandmarkType; NUM_LANDMARKS] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftMouth,
        Self::RightMouth,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// A single detected joint in preview pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseLandmark {
    pub landmark_type: PoseLandmarkType,
    pub position: Point2<f32>,
    /// Likelihood that the joint is inside the frame, between 0 and 1.
    pub in_frame_likelihood: f32,
}

impl PoseLandmark {
    pub fn new(landmark_type: PoseLandmarkType, x: f32, y: f32, in_frame_likelihood: f32) -> Self {
        Self {
            landmark_type,
            position: Point2::new(x, y),
            in_frame_likelihood,
        }
    }
}

/// Landmarks detected for one person in one frame. Any joint may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    landmarks: [Option<PoseLandmark>; NUM_LANDMARKS],
}

impl Default for Pose {
    fn default() -> Self {
        Self::empty()
    }
}

impl Pose {
    pub fn empty() -> Self {
        Self {
            landmarks: [None; NUM_LANDMARKS],
        }
    }

    /// Builds a pose, a later landmark of the same type replaces an earlier one.
    pub fn from_landmarks<I>(landmarks: I) -> Self
    where
        I: IntoIterator<Item = PoseLandmark>,
    {
        let mut pose = Self::empty();
        for landmark in landmarks {
            pose.landmarks[landmark.landmark_type.index()] = Some(landmark);
        }
        pose
    }

    pub fn landmark(&self, landmark_type: PoseLandmarkType) -> Option<&PoseLandmark> {
        self.landmarks[landmark_type.index()].as_ref()
    }

    /// All present landmarks in model order.
    pub fn landmarks(&self) -> impl Iterator<Item = &PoseLandmark> + '_ {
        self.landmarks.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.landmarks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(Option::is_none)
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("no pose detected in frame")]
    NoPose,

    #[error("pose model has no more results")]
    Exhausted,

    #[error("pose detection failed: {0}")]
    Failed(String),
}

/// Pose estimation model, run once per analysed frame.
pub trait PoseDetectionModel: Send {
    fn run(&mut self, image: &DynamicImage) -> Result<Pose, DetectionError>;
}
