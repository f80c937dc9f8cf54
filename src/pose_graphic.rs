use image::Rgba;

use crate::overlay::canvas::{Canvas, Paint, PaintStyle};
use crate::overlay::{Graphic, Transform};
use crate::pose_landmarks::{Pose, PoseLandmarkType};

use PoseLandmarkType::*;

pub type Connection = (PoseLandmarkType, PoseLandmarkType);

/// Joint pairs drawn as the stick figure, including both torso diagonals.
pub const SKELETON_CONNECTIONS: [Connection; 14] = [
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    (LeftHip, LeftKnee),
    (LeftKnee, LeftAnkle),
    (RightHip, RightKnee),
    (RightKnee, RightAnkle),
    (LeftShoulder, RightHip),
    (RightShoulder, LeftHip),
];

pub const LANDMARK_RADIUS: f32 = 12.0;

pub const LANDMARK_PAINT: Paint = Paint::new(Rgba([0, 255, 0, 255]), 12.0, PaintStyle::Fill);

pub const SKELETON_PAINT: Paint = Paint::new(Rgba([255, 0, 0, 255]), 8.0, PaintStyle::Stroke);

/// Draws one detected pose: a marker per landmark and the skeleton lines.
pub struct PoseGraphic {
    pose: Pose,
    connections: &'static [Connection],
}

impl PoseGraphic {
    pub fn new(pose: Pose) -> Self {
        Self::with_connections(pose, &SKELETON_CONNECTIONS)
    }

    pub fn with_connections(pose: Pose, connections: &'static [Connection]) -> Self {
        Self { pose, connections }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    fn draw_skeleton(&self, canvas: &mut dyn Canvas, transform: &Transform) {
        for (first, second) in self.connections {
            let (Some(first), Some(second)) =
                (self.pose.landmark(*first), self.pose.landmark(*second))
            else {
                continue;
            };

            canvas.draw_line(
                transform.map_point(first.position),
                transform.map_point(second.position),
                &SKELETON_PAINT,
            );
        }
    }
}

impl Graphic for PoseGraphic {
    fn draw(&self, canvas: &mut dyn Canvas, transform: &Transform) {
        for landmark in self.pose.landmarks() {
            canvas.draw_circle(
                transform.map_point(landmark.position),
                LANDMARK_RADIUS,
                &LANDMARK_PAINT,
            );
        }

        self.draw_skeleton(canvas, transform);
    }
}
