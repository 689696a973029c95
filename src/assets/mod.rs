//! # Assets
//!
//! Captions, photos and the geometry derived from them.
//!
//! Nothing in here fails loudly. A missing caption file yields the built-in
//! captions, and a photo that can't be read or decoded is swapped for a
//! generated placeholder. Photos load on a background thread; each one is
//! announced separately so its ornament can appear as soon as it is ready.

pub mod caption;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use futures::channel::mpsc::{self, UnboundedReceiver};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::AssetError;

pub use caption::{CaptionLayout, CaptionRasterizer};

/// Longest side of a photo as uploaded to the GPU.
pub const MAX_TEXTURE_SIDE: u32 = 1024;

/// Captions used when the caption file has too few lines.
pub const DEFAULT_CAPTIONS: [&str; 4] = ["圣诞快乐", "爱在人间", "Memory 2025", "祝平安"];

/// Fewer usable lines than this and the file is ignored.
pub const MIN_CAPTIONS: usize = 5;

/// Splits a line-delimited caption resource into trimmed, non-empty lines.
pub fn parse_captions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Keeps `captions` if there are at least [`MIN_CAPTIONS`], otherwise
/// returns the built-in list.
pub fn resolve_captions(captions: Vec<String>) -> Vec<String> {
    if captions.len() >= MIN_CAPTIONS {
        captions
    } else {
        if !captions.is_empty() {
            log::warn!(
                "Only {} captions supplied, need {MIN_CAPTIONS}; using defaults",
                captions.len()
            );
        }
        DEFAULT_CAPTIONS.iter().map(|s| s.to_string()).collect()
    }
}

/// Reads and resolves the caption file, falling back on any I/O error.
pub fn load_captions(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => resolve_captions(parse_captions(&text)),
        Err(source) => {
            let err = AssetError::Io {
                path: path.to_path_buf(),
                source,
            };
            log::warn!("{err}; using default captions");
            resolve_captions(Vec::new())
        }
    }
}

/// `dir/1.jpg ..= dir/{count}.jpg`
pub fn photo_paths(dir: &Path, count: usize) -> Vec<PathBuf> {
    (1..=count).map(|i| dir.join(format!("{i}.jpg"))).collect()
}

/// One decoded photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoAsset {
    pub path: PathBuf,
    /// Size of the source image
    pub width: u32,
    pub height: u32,
    /// Pixels, downscaled to at most [`MAX_TEXTURE_SIDE`]
    pub image: Arc<RgbaImage>,
    /// True when this is the generated placeholder
    pub fallback: bool,
}

impl PhotoAsset {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Decodes `path`.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetError::EmptyImage(path.to_path_buf()));
        }
        Ok(Self::from_image(path, &image, false))
    }

    /// Decodes `path`, or returns the placeholder if that fails.
    pub fn load_or_fallback(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            log::warn!("{err}; using placeholder");
            Self::placeholder(path)
        })
    }

    /// A square red and gold checkerboard.
    pub fn placeholder(path: &Path) -> Self {
        let image = RgbaImage::from_fn(64, 64, |x, y| {
            if (x / 16 + y / 16) % 2 == 0 {
                Rgba([0xd4, 0xaf, 0x37, 0xff])
            } else {
                Rgba([0x8b, 0x00, 0x00, 0xff])
            }
        });
        Self::from_image(path, &DynamicImage::ImageRgba8(image), true)
    }

    fn from_image(path: &Path, image: &DynamicImage, fallback: bool) -> Self {
        let pixels = if image.width().max(image.height()) > MAX_TEXTURE_SIDE {
            image.thumbnail(MAX_TEXTURE_SIDE, MAX_TEXTURE_SIDE).to_rgba8()
        } else {
            image.to_rgba8()
        };
        Self {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            image: Arc::new(pixels),
            fallback,
        }
    }
}

/// A photo that finished loading.
#[derive(Debug, Clone)]
pub struct LoadedPhoto {
    pub index: usize,
    pub asset: PhotoAsset,
}

/// Decodes photos on a background thread, one event per photo.
pub struct AssetLoader {
    receiver: UnboundedReceiver<LoadedPhoto>,
    expected: usize,
    received: usize,
}

impl AssetLoader {
    pub fn spawn(paths: Vec<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        let expected = paths.len();
        log::info!("Loading {expected} photos");
        thread::spawn(move || {
            for (index, path) in paths.into_iter().enumerate() {
                let asset = PhotoAsset::load_or_fallback(&path);
                if sender.unbounded_send(LoadedPhoto { index, asset }).is_err() {
                    break;
                }
            }
        });
        Self {
            receiver,
            expected,
            received: 0,
        }
    }

    /// Photos that finished since the last call.
    pub fn poll(&mut self) -> Vec<LoadedPhoto> {
        let mut ready = Vec::new();
        while let Ok(Some(photo)) = self.receiver.try_next() {
            ready.push(photo);
        }
        self.received += ready.len();
        ready
    }

    pub fn is_finished(&self) -> bool {
        self.received >= self.expected
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.received, self.expected)
    }
}

/// Polaroid-style frame sized to a photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    /// Width, height, depth of the frame board
    pub frame: [f32; 3],
    /// Width, height of the picture
    pub photo: [f32; 2],
    /// Picture centre relative to the frame centre
    pub photo_offset: [f32; 3],
    /// Caption strip centre relative to the frame centre
    pub caption_offset: [f32; 3],
    pub caption_size: [f32; 2],
}

impl FrameGeometry {
    pub const MAX_SIDE: f32 = 0.85;
    pub const MARGIN_SIDE: f32 = 0.08;
    pub const MARGIN_TOP: f32 = 0.08;
    pub const MARGIN_BOTTOM: f32 = 0.32;
    pub const DEPTH: f32 = 0.05;

    pub fn for_aspect(aspect: f32) -> Self {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        let (pw, ph) = if aspect >= 1.0 {
            (Self::MAX_SIDE, Self::MAX_SIDE / aspect)
        } else {
            (Self::MAX_SIDE * aspect, Self::MAX_SIDE)
        };

        let fw = pw + Self::MARGIN_SIDE * 2.0;
        let fh = ph + Self::MARGIN_TOP + Self::MARGIN_BOTTOM;
        let py = fh / 2.0 - Self::MARGIN_TOP - ph / 2.0;
        let ty = -(fh / 2.0) + Self::MARGIN_BOTTOM / 2.0 + 0.01;

        Self {
            frame: [fw, fh, Self::DEPTH],
            photo: [pw, ph],
            photo_offset: [0.0, py, 0.03],
            caption_offset: [0.0, ty, 0.031],
            caption_size: [fw * 0.9, Self::MARGIN_BOTTOM * 0.8],
        }
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::for_aspect(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_captions_trims_and_skips_blank() {
        let got = parse_captions("  one \n\n two\r\n   \nthree");
        assert_eq!(got, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_empty_captions_fall_back() {
        let got = resolve_captions(Vec::new());
        assert!(got.len() >= 4);
        assert_eq!(got[0], "圣诞快乐");
    }

    #[test]
    fn test_short_caption_list_is_replaced() {
        let got = resolve_captions(parse_captions("a\nb\nc"));
        assert_eq!(got, DEFAULT_CAPTIONS.to_vec());
    }

    #[test]
    fn test_enough_captions_are_kept() {
        let got = resolve_captions(parse_captions("a\nb\nc\nd\ne"));
        assert_eq!(got, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_missing_caption_file_uses_defaults() {
        let got = load_captions(Path::new("/definitely/not/here.txt"));
        assert_eq!(got.len(), DEFAULT_CAPTIONS.len());
    }

    #[test]
    fn test_photo_paths_are_one_based() {
        let paths = photo_paths(Path::new("images"), 3);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("images/1.jpg"),
                PathBuf::from("images/2.jpg"),
                PathBuf::from("images/3.jpg")
            ]
        );
    }

    #[test]
    fn test_missing_photo_uses_placeholder() {
        let path = Path::new("/definitely/not/here.jpg");
        assert!(matches!(PhotoAsset::load(path), Err(AssetError::Io { .. })));
        let asset = PhotoAsset::load_or_fallback(path);
        assert!(asset.fallback);
        assert_eq!(asset.aspect(), 1.0);
    }

    #[test]
    fn test_undecodable_photo_uses_placeholder() {
        let path = std::env::temp_dir().join("memory_tree_not_an_image.jpg");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(matches!(
            PhotoAsset::load(&path),
            Err(AssetError::Decode { .. })
        ));
        assert!(PhotoAsset::load_or_fallback(&path).fallback);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_decoded_photo_keeps_pixels() {
        let path = std::env::temp_dir().join("memory_tree_red.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();
        let asset = PhotoAsset::load(&path).unwrap();
        assert_eq!((asset.width, asset.height), (40, 20));
        assert_eq!(asset.aspect(), 2.0);
        assert_eq!(asset.image.dimensions(), (40, 20));
        assert_eq!(asset.image.get_pixel(3, 7).0, [255, 0, 0, 255]);
        assert!(!asset.fallback);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_large_photo_is_downscaled_for_upload() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(2048, 512));
        let asset = PhotoAsset::from_image(Path::new("big.jpg"), &image, false);
        assert_eq!((asset.width, asset.height), (2048, 512));
        assert_eq!(asset.image.dimensions(), (1024, 256));
        assert_eq!(asset.aspect(), 4.0);
    }

    #[test]
    fn test_loader_reports_every_photo() {
        let paths = photo_paths(Path::new("/definitely/not/here"), 4);
        let mut loader = AssetLoader::spawn(paths);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while !loader.is_finished() && Instant::now() < deadline {
            seen.extend(loader.poll().into_iter().map(|p| p.index));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(loader.is_finished());
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_frame_geometry_landscape() {
        let g = FrameGeometry::for_aspect(2.0);
        assert_eq!(g.photo, [0.85, 0.425]);
        assert!((g.frame[0] - 1.01).abs() < 1e-6);
        assert!((g.frame[1] - (0.425 + 0.4)).abs() < 1e-6);
        assert_eq!(g.frame[2], 0.05);
    }

    #[test]
    fn test_frame_geometry_portrait() {
        let g = FrameGeometry::for_aspect(0.5);
        assert_eq!(g.photo, [0.425, 0.85]);
        // Picture sits top-aligned under the top margin.
        let top = g.photo_offset[1] + g.photo[1] / 2.0;
        assert!((g.frame[1] / 2.0 - top - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_frame_geometry_rejects_bad_aspect() {
        assert_eq!(FrameGeometry::for_aspect(f32::NAN), FrameGeometry::default());
    }
}
