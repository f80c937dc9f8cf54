use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use clap::Parser;

use posetracking::analysis::{spawn_analysis_worker, Frame, LatestFrameSlot, PoseAnalyzer};
use posetracking::app::PoseOverlayApp;
use posetracking::config::Config;
use posetracking::frames::{DirectoryFrameSource, FrameSource};
use posetracking::overlay::{Facing, GraphicOverlay};
use posetracking::pose_landmarks::model_replay::ReplayPoseModel;
use posetracking::render::render_to_directory;
use posetracking::utils::{SharedState, State};
use posetracking::Error;

// function that runs as a thread and plays the frame source like a camera
fn capture_thread(
    mut source: DirectoryFrameSource,
    config: Config,
    slot: Arc<LatestFrameSlot>,
    shared_state: SharedState,
) {
    let interval = config.frame_interval();
    let mut sequence = 0u64;

    while let Some(image) = source.next_frame() {
        let started = Instant::now();

        match image {
            Ok(image) => {
                let image = Arc::new(image);

                // the preview is shown mirrored for front cameras, analysis
                // gets the raw frame and the overlay does the mirroring
                let preview = match config.facing {
                    Facing::Front => Arc::new(image.fliph()),
                    Facing::Back => Arc::clone(&image),
                };
                {
                    let mut state = shared_state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.set_image(preview);
                    state.frames_captured += 1;
                }

                if !slot.offer(Frame::new(image, config.facing, sequence)) {
                    break;
                }
            }
            Err(e) => log::warn!("skipping frame {}: {}", sequence, e),
        }
        sequence += 1;

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    log::info!("frame source finished after {} frames", sequence);
}

fn run_headless(config: &Config, output: &std::path::Path) -> Result<(), Error> {
    // looping a directory would never finish
    let mut source = DirectoryFrameSource::open(&config.frames, false)?;
    let model = ReplayPoseModel::open(&config.poses, config.looping)?;

    let overlay = Arc::new(GraphicOverlay::new());
    overlay.on_resized(config.surface_width, config.surface_height);
    let mut analyzer = PoseAnalyzer::new(model, overlay);

    let written = render_to_directory(&mut source, &mut analyzer, config.facing, output)?;
    let stats = analyzer.stats();
    log::info!(
        "wrote {} frames, {} poses drawn, {} failed detections",
        written.len(),
        stats.poses_drawn,
        stats.detection_failures
    );
    Ok(())
}

fn run_viewer(config: Config) -> Result<(), Error> {
    let source = DirectoryFrameSource::open(&config.frames, config.looping)?;
    let model = ReplayPoseModel::open(&config.poses, config.looping)?;

    let shared_state: SharedState = Arc::new(Mutex::new(State {
        facing: config.facing,
        ..State::default()
    }));
    let overlay = Arc::new(GraphicOverlay::new());
    let slot = Arc::new(LatestFrameSlot::new());

    let analyzer = PoseAnalyzer::new(model, Arc::clone(&overlay));
    let worker = spawn_analysis_worker(Arc::clone(&slot), analyzer, Arc::clone(&shared_state))?;

    let capture = {
        let slot = Arc::clone(&slot);
        let shared_state = Arc::clone(&shared_state);
        let config = config.clone();
        thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || capture_thread(source, config, slot, shared_state))?
    };

    let native_options = eframe::NativeOptions::default();
    let result = eframe::run_native(
        "Pose tracking",
        native_options,
        Box::new(move |cc| Box::new(PoseOverlayApp::new(cc, shared_state, overlay))),
    );

    slot.close();
    let _ = capture.join();
    let _ = worker.join();

    result.map_err(|e| Error::Gui(e.to_string()))
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!(
        "starting with frames from {}, poses from {}",
        config.frames.display(),
        config.poses.display()
    );

    match config.output.clone() {
        Some(output) => run_headless(&config, &output),
        None => run_viewer(config),
    }
}
