use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use image::DynamicImage;

use crate::overlay::{Facing, GraphicOverlay};
use crate::pose_graphic::PoseGraphic;
use crate::pose_landmarks::PoseDetectionModel;
use crate::utils::{FpsCounter, SharedState};

/// A preview frame handed to the analysis worker.
#[derive(Clone)]
pub struct Frame {
    pub image: Arc<DynamicImage>,
    pub facing: Facing,
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: Arc<DynamicImage>, facing: Facing, sequence: u64) -> Self {
        Self {
            image,
            facing,
            sequence,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

struct SlotState {
    frame: Option<Frame>,
    dropped: u64,
    closed: bool,
}

/// Holds at most one pending frame. A new frame replaces one the worker has
/// not picked up yet, so analysis always runs on the newest frame.
pub struct LatestFrameSlot {
    state: Mutex<SlotState>,
    available: Condvar,
}

impl Default for LatestFrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                frame: None,
                dropped: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands a frame to the worker, returns false if the slot is closed.
    pub fn offer(&self, frame: Frame) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }
        if state.frame.replace(frame).is_some() {
            state.dropped += 1;
        }
        self.available.notify_one();
        true
    }

    /// Blocks until a frame is available. `None` once the slot is closed.
    pub fn take(&self) -> Option<Frame> {
        let mut state = self.state();
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stops the worker. A frame still pending is discarded.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.frame = None;
        self.available.notify_all();
    }

    pub fn dropped(&self) -> u64 {
        self.state().dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The overlay now shows this frame's pose.
    Updated { landmarks: usize },
    /// Detection failed, the previous overlay was kept.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub frames_analyzed: u64,
    pub poses_drawn: u64,
    pub detection_failures: u64,
}

/// Runs the pose model on frames and puts the result on the overlay.
pub struct PoseAnalyzer<M> {
    model: M,
    overlay: Arc<GraphicOverlay>,
    camera_info: Option<(u32, u32, Facing)>,
    stats: AnalysisStats,
}

impl<M: PoseDetectionModel> PoseAnalyzer<M> {
    pub fn new(model: M, overlay: Arc<GraphicOverlay>) -> Self {
        Self {
            model,
            overlay,
            camera_info: None,
            stats: AnalysisStats::default(),
        }
    }

    pub fn analyze(&mut self, frame: &Frame) -> AnalysisOutcome {
        let (width, height) = frame.size();
        let info = (width, height, frame.facing);
        if self.camera_info != Some(info) {
            self.overlay.set_camera_info(width, height, frame.facing);
            self.camera_info = Some(info);
        }

        self.stats.frames_analyzed += 1;

        match self.model.run(&frame.image) {
            Ok(pose) => {
                let landmarks = pose.len();
                self.overlay.set_graphic(Arc::new(PoseGraphic::new(pose)));
                self.stats.poses_drawn += 1;
                log::debug!("frame {}: drew {} landmarks", frame.sequence, landmarks);
                AnalysisOutcome::Updated { landmarks }
            }
            Err(e) => {
                // keep whatever the overlay showed before
                self.stats.detection_failures += 1;
                log::warn!("frame {}: {}", frame.sequence, e);
                AnalysisOutcome::Skipped
            }
        }
    }

    pub fn stats(&self) -> AnalysisStats {
        self.stats
    }

    pub fn overlay(&self) -> &Arc<GraphicOverlay> {
        &self.overlay
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

/// Runs `analyzer` on a worker thread until `slot` is closed, then returns it.
pub fn spawn_analysis_worker<M>(
    slot: Arc<LatestFrameSlot>,
    mut analyzer: PoseAnalyzer<M>,
    shared_state: SharedState,
) -> std::io::Result<JoinHandle<PoseAnalyzer<M>>>
where
    M: PoseDetectionModel + 'static,
{
    thread::Builder::new()
        .name("pose-analysis".to_string())
        .spawn(move || {
            let mut fps = FpsCounter::new(10);

            while let Some(frame) = slot.take() {
                analyzer.analyze(&frame);

                let fps = fps.tick();
                let stats = analyzer.stats();
                let mut state = shared_state.lock().unwrap_or_else(PoisonError::into_inner);
                state.fps = fps;
                state.frames_dropped = slot.dropped();
                state.poses_drawn = stats.poses_drawn;
                state.detection_failures = stats.detection_failures;
            }

            log::debug!("analysis worker stopped");
            analyzer
        })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::overlay::canvas::tests::RecordingCanvas;
    use crate::pose_landmarks::{DetectionError, Pose, PoseLandmark, PoseLandmarkType};
    use crate::utils::State;

    /// Returns queued results in order, then fails.
    struct ScriptedModel(VecDeque<Result<Pose, DetectionError>>);

    impl PoseDetectionModel for ScriptedModel {
        fn run(&mut self, _image: &DynamicImage) -> Result<Pose, DetectionError> {
            self.0.pop_front().unwrap_or(Err(DetectionError::Exhausted))
        }
    }

    fn nose_at(x: f32, y: f32) -> Pose {
        Pose::from_landmarks([PoseLandmark::new(PoseLandmarkType::Nose, x, y, 1.0)])
    }

    fn frame(width: u32, height: u32, facing: Facing, sequence: u64) -> Frame {
        Frame::new(Arc::new(DynamicImage::new_rgb8(width, height)), facing, sequence)
    }

    #[test]
    fn failed_detection_keeps_last_overlay() {
        let overlay = Arc::new(GraphicOverlay::new());
        let model = ScriptedModel(VecDeque::from(vec![
            Ok(nose_at(10.0, 20.0)),
            Err(DetectionError::Failed("model crashed".to_string())),
        ]));
        let mut analyzer = PoseAnalyzer::new(model, Arc::clone(&overlay));

        assert_eq!(
            analyzer.analyze(&frame(64, 48, Facing::Back, 0)),
            AnalysisOutcome::Updated { landmarks: 1 }
        );
        assert_eq!(analyzer.analyze(&frame(64, 48, Facing::Back, 1)), AnalysisOutcome::Skipped);

        let mut canvas = RecordingCanvas::default();
        assert_eq!(overlay.paint(&mut canvas), 1);
        assert_eq!(canvas.circles().len(), 1);

        let stats = analyzer.stats();
        assert_eq!(stats.frames_analyzed, 2);
        assert_eq!(stats.poses_drawn, 1);
        assert_eq!(stats.detection_failures, 1);
    }

    #[test]
    fn each_success_replaces_the_previous_pose() {
        let overlay = Arc::new(GraphicOverlay::new());
        let model = ScriptedModel(VecDeque::from(vec![
            Ok(nose_at(10.0, 20.0)),
            Ok(nose_at(30.0, 40.0)),
            Ok(Pose::empty()),
        ]));
        let mut analyzer = PoseAnalyzer::new(model, Arc::clone(&overlay));

        analyzer.analyze(&frame(64, 48, Facing::Back, 0));
        analyzer.analyze(&frame(64, 48, Facing::Back, 1));
        assert_eq!(overlay.len(), 1);
        let mut canvas = RecordingCanvas::default();
        overlay.paint(&mut canvas);
        assert_eq!(canvas.circles(), vec![nalgebra::Point2::new(30.0, 40.0)]);

        // nobody in frame clears the figure
        analyzer.analyze(&frame(64, 48, Facing::Back, 2));
        let mut canvas = RecordingCanvas::default();
        assert_eq!(overlay.paint(&mut canvas), 1);
        assert!(canvas.shapes.is_empty());
    }

    #[test]
    fn frame_geometry_becomes_camera_info() {
        let overlay = Arc::new(GraphicOverlay::new());
        let model = ScriptedModel(VecDeque::new());
        let mut analyzer = PoseAnalyzer::new(model, Arc::clone(&overlay));

        analyzer.analyze(&frame(640, 480, Facing::Front, 0));
        assert_eq!(overlay.preview_size(), (640, 480));
        assert_eq!(overlay.facing(), Facing::Front);

        analyzer.analyze(&frame(320, 240, Facing::Back, 1));
        assert_eq!(overlay.preview_size(), (320, 240));
        assert_eq!(overlay.facing(), Facing::Back);
    }

    #[test]
    fn slot_keeps_only_the_newest_frame() {
        let slot = LatestFrameSlot::new();
        assert!(slot.offer(frame(2, 2, Facing::Back, 0)));
        assert!(slot.offer(frame(2, 2, Facing::Back, 1)));
        assert!(slot.offer(frame(2, 2, Facing::Back, 2)));

        assert_eq!(slot.take().map(|f| f.sequence), Some(2));
        assert_eq!(slot.dropped(), 2);

        slot.close();
        assert!(slot.take().is_none());
        assert!(!slot.offer(frame(2, 2, Facing::Back, 3)));
    }

    #[test]
    fn close_wakes_a_waiting_worker() {
        let slot = Arc::new(LatestFrameSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.take().is_none())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        slot.close();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn worker_analyzes_until_closed() {
        let overlay = Arc::new(GraphicOverlay::new());
        let shared_state: SharedState = Arc::new(Mutex::new(State::default()));
        let slot = Arc::new(LatestFrameSlot::new());
        let model = ScriptedModel(VecDeque::from(vec![Ok(nose_at(1.0, 1.0))]));
        let analyzer = PoseAnalyzer::new(model, Arc::clone(&overlay));

        let handle =
            spawn_analysis_worker(Arc::clone(&slot), analyzer, Arc::clone(&shared_state)).unwrap();

        slot.offer(frame(8, 8, Facing::Back, 0));
        while shared_state.lock().unwrap().poses_drawn == 0 {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        slot.close();

        let analyzer = handle.join().unwrap();
        assert_eq!(analyzer.stats().poses_drawn, 1);
        assert_eq!(overlay.len(), 1);
    }
}
