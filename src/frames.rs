use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::Error;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Pulls preview frames from somewhere (camera, files, test generator).
pub trait FrameSource: Send {
    /// Next frame, `None` once the source is done.
    fn next_frame(&mut self) -> Option<Result<DynamicImage, Error>>;
}

/// Plays the images of a directory in file name order.
pub struct DirectoryFrameSource {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl DirectoryFrameSource {
    pub fn open<P: AsRef<Path>>(dir: P, looping: bool) -> Result<Self, Error> {
        let dir = dir.as_ref();

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(Error::NoFrames(dir.to_path_buf()));
        }
        paths.sort();

        log::info!("playing {} frames from {}", paths.len(), dir.display());

        Ok(Self {
            paths,
            next: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Option<Result<DynamicImage, Error>> {
        if self.next >= self.paths.len() {
            if !self.looping {
                return None;
            }
            self.next = 0;
        }

        let path = &self.paths[self.next];
        self.next += 1;

        Some(image::open(path).map_err(Error::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("posetracking-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn plays_images_in_name_order() {
        let dir = scratch_dir("frames");
        DynamicImage::new_rgb8(3, 2).save(dir.join("b.png")).unwrap();
        DynamicImage::new_rgb8(5, 4).save(dir.join("a.png")).unwrap();
        fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectoryFrameSource::open(&dir, false).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.width(), first.height()), (5, 4));
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!((second.width(), second.height()), (3, 2));
        assert!(source.next_frame().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn looping_source_restarts() {
        let dir = scratch_dir("looping");
        DynamicImage::new_rgb8(2, 2).save(dir.join("only.png")).unwrap();

        let mut source = DirectoryFrameSource::open(&dir, true).unwrap();
        for _ in 0..3 {
            assert!(source.next_frame().unwrap().is_ok());
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn directory_without_images_is_an_error() {
        let dir = scratch_dir("empty");
        assert!(matches!(
            DirectoryFrameSource::open(&dir, false),
            Err(Error::NoFrames(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
