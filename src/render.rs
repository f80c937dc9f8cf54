use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::analysis::{Frame, PoseAnalyzer};
use crate::frames::FrameSource;
use crate::overlay::canvas::ImageCanvas;
use crate::overlay::{Facing, GraphicOverlay};
use crate::pose_landmarks::PoseDetectionModel;
use crate::Error;

/// Scales the preview to the overlay surface and paints the overlay on top.
pub fn render_overlay(overlay: &GraphicOverlay, preview: &DynamicImage) -> RgbaImage {
    let (mut width, mut height) = overlay.size();
    if width == 0 || height == 0 {
        // no layout yet, use the preview size as the surface
        (width, height) = (preview.width(), preview.height());
        overlay.on_resized(width, height);
    }

    let mut surface = if (width, height) == (preview.width(), preview.height()) {
        preview.to_rgba8()
    } else {
        imageops::resize(&preview.to_rgba8(), width, height, FilterType::Triangle)
    };

    let facing = overlay.facing();
    if facing == Facing::Front {
        // the overlay is mirrored for front cameras, so is the preview
        imageops::flip_horizontal_in_place(&mut surface);
    }

    overlay.paint(&mut ImageCanvas::new(&mut surface));
    surface
}

/// Analyses every frame of `source` and writes the annotated surface as
/// `frame_NNNNN.png` into `output`. Returns the written paths.
pub fn render_to_directory<M, S>(
    source: &mut S,
    analyzer: &mut PoseAnalyzer<M>,
    facing: Facing,
    output: &Path,
) -> Result<Vec<PathBuf>, Error>
where
    M: PoseDetectionModel,
    S: FrameSource + ?Sized,
{
    fs::create_dir_all(output)?;
    log::info!("rendering overlay frames to {}", output.display());

    let mut written = Vec::new();
    let mut sequence = 0u64;

    while let Some(image) = source.next_frame() {
        let image = match image {
            Ok(image) => Arc::new(image),
            Err(e) => {
                log::warn!("skipping frame {}: {}", sequence, e);
                sequence += 1;
                continue;
            }
        };

        let frame = Frame::new(image, facing, sequence);
        analyzer.analyze(&frame);

        let surface = render_overlay(analyzer.overlay(), &frame.image);
        let path = output.join(format!("frame_{:05}.png", sequence));
        surface.save(&path)?;
        written.push(path);

        sequence += 1;
    }

    Ok(written)
}
