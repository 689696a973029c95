//! # Configuration
//!
//! Tunable constants for every stage of the memory tree, grouped by the
//! component that consumes them. Every struct has a `Default` matching the
//! values the scene was designed around, plus `with_*` setters for the
//! handful of knobs callers commonly change.

use std::path::PathBuf;
use std::time::Duration;

use crate::layout::OrnamentKind;

/// Geometry of the assembled tree silhouette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeShape {
    /// Vertical extent covered by the spiral
    pub height: f32,
    /// Radius of the cone at its base
    pub base_radius: f32,
    /// Y coordinate of the tip
    pub apex_y: f32,
    /// Fraction of the cone the spiral is allowed to reach
    pub progress_limit: f32,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            height: 18.0,
            base_radius: 7.5,
            apex_y: 9.0,
            progress_limit: 0.92,
        }
    }
}

/// Parameters of the chaos/assembled transition.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendConfig {
    /// Exponential approach rate of `current_mix`, per second
    pub rate: f32,
    /// Camera distance range mapped onto `zoom_scale`
    pub zoom_distance: (f32, f32),
    /// Scale multiplier at the near and far end of `zoom_distance`
    pub zoom_scale: (f32, f32),
    /// Near multiplier used instead of `zoom_scale.0` on compact viewports
    pub compact_zoom_near: f32,
    /// Uniform scale applied to zoom-compensated kinds on compact viewports
    pub compact_scale: f32,
    /// Zoom compensation is only applied while `current_mix` is below this
    pub zoom_cutoff: f32,
    /// Above this mix, facing kinds turn toward the trunk
    pub face_threshold: f32,
    /// Below this mix, free-spinning kinds accumulate idle spin
    pub spin_threshold: f32,
    /// Idle spin speed in radians per second
    pub spin_rate: f32,
    /// Kinds that receive the distance-based zoom compensation
    pub zoom_kinds: Vec<OrnamentKind>,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            rate: 2.0,
            zoom_distance: (10.0, 60.0),
            zoom_scale: (1.6, 0.6),
            compact_zoom_near: 1.2,
            compact_scale: 0.75,
            zoom_cutoff: 0.98,
            face_threshold: 0.8,
            spin_threshold: 0.5,
            spin_rate: 0.5,
            zoom_kinds: vec![OrnamentKind::Photo],
        }
    }
}

impl BlendConfig {
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate.max(0.0);
        self
    }

    pub fn with_zoom_kinds(mut self, kinds: Vec<OrnamentKind>) -> Self {
        self.zoom_kinds = kinds;
        self
    }
}

/// Thresholds and windows of the gesture signal processor.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Number of raw openness ratios averaged into the smoothed ratio
    pub ratio_window: usize,
    /// Number of wrist positions averaged into the pointer position
    pub position_window: usize,
    /// Closed -> Open when the smoothed ratio rises above this
    pub open_threshold: f32,
    /// Open -> Closed when the smoothed ratio falls below this
    pub close_threshold: f32,
    /// Consecutive missed detections tolerated before the hand is lost
    pub miss_limit: u32,
    /// Minimum spacing between two inference calls
    pub interval: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            ratio_window: 5,
            position_window: 8,
            open_threshold: 1.6,
            close_threshold: 1.2,
            miss_limit: 5,
            interval: Duration::from_millis(100),
        }
    }
}

impl GestureConfig {
    pub fn with_thresholds(mut self, close: f32, open: f32) -> Self {
        self.close_threshold = close.min(open);
        self.open_threshold = open.max(close);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_miss_limit(mut self, miss_limit: u32) -> Self {
        self.miss_limit = miss_limit;
        self
    }
}

/// How one ornament category is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConfig {
    pub kind: OrnamentKind,
    pub count: usize,
    /// Base uniform scale before the per-slot random factor
    pub scale: f32,
    /// Colours picked uniformly per slot
    pub palette: Vec<[f32; 4]>,
}

impl GroupConfig {
    pub fn new(kind: OrnamentKind, count: usize, scale: f32, palette: &[u32]) -> Self {
        Self {
            kind,
            count,
            scale,
            palette: palette.iter().map(|&hex| hex_color(hex)).collect(),
        }
    }
}

/// Content of the composed scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub shape: TreeShape,
    pub groups: Vec<GroupConfig>,
    /// Number of particles filling the tree body
    pub foliage_count: usize,
    /// Tree body gradient, bottom and top colour
    pub foliage_colors: ([f32; 4], [f32; 4]),
    /// Radius of the sphere chaos positions are sampled from
    pub chaos_radius: f32,
    /// Radius and height of the cylinder photo chaos positions lie on
    pub photo_ring: (f32, f32),
    /// Number of items hung from the decorative rope
    pub rope_items: usize,
    /// Number of samples used to draw the rope line
    pub rope_samples: usize,
    /// Mix the scene starts at (1 = assembled)
    pub initial_mix: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shape: TreeShape::default(),
            groups: vec![
                GroupConfig::new(
                    OrnamentKind::Sphere,
                    120,
                    0.28,
                    &[0xd4af37, 0xb22222, 0xf5f5f5, 0x8b0000],
                ),
                GroupConfig::new(OrnamentKind::Box, 36, 0.55, &[0xb22222, 0x1e5631, 0xd4af37]),
                GroupConfig::new(OrnamentKind::Star, 40, 0.32, &[0xffd700, 0xfff4c2]),
                GroupConfig::new(OrnamentKind::Rod, 60, 0.6, &[0xf5f5f5, 0xb22222]),
                GroupConfig::new(OrnamentKind::Crystal, 48, 0.25, &[0x9fd8ff, 0xe0f4ff]),
                GroupConfig::new(OrnamentKind::Photo, 12, 1.1, &[0xfefefe]),
            ],
            foliage_count: 900,
            foliage_colors: (hex_color(0x022b1c), hex_color(0x217a46)),
            chaos_radius: 25.0,
            photo_ring: (18.0, 14.0),
            rope_items: 12,
            rope_samples: 100,
            initial_mix: 1.0,
        }
    }
}

impl SceneConfig {
    /// Overrides the number of slots of one kind, adding the group if absent.
    pub fn with_count(mut self, kind: OrnamentKind, count: usize) -> Self {
        match self.groups.iter_mut().find(|g| g.kind == kind) {
            Some(group) => group.count = count,
            None => self.groups.push(GroupConfig::new(kind, count, 0.3, &[0xffffff])),
        }
        self
    }

    pub fn with_foliage(mut self, count: usize) -> Self {
        self.foliage_count = count;
        self
    }

    pub fn with_rope_items(mut self, count: usize) -> Self {
        self.rope_items = count;
        self
    }

    pub fn count_of(&self, kind: OrnamentKind) -> usize {
        self.groups
            .iter()
            .filter(|g| g.kind == kind)
            .map(|g| g.count)
            .sum()
    }
}

/// Settings of the presentation shell.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory the photos are read from
    pub asset_dir: PathBuf,
    /// Line-delimited caption file
    pub caption_file: PathBuf,
    /// Fonts tried in order for caption text. The defaults cover the CJK
    /// default captions on common desktops.
    pub caption_fonts: Vec<PathBuf>,
    /// Number of photos requested as `1.jpg ..= N.jpg`
    pub photo_count: usize,
    pub window_size: (u32, u32),
    /// Viewports narrower than this (logical pixels) use the compact scale
    pub compact_width: u32,
    /// Minimum time the loading state is shown for
    pub loading_delay: Duration,
    pub scene: SceneConfig,
    pub blend: BlendConfig,
    pub gesture: GestureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets/images"),
            caption_file: PathBuf::from("assets/captions.txt"),
            caption_fonts: [
                "assets/fonts/caption.ttf",
                "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
                "/usr/share/fonts/noto-cjk/NotoSansCJK-Bold.ttc",
                "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
                "/System/Library/Fonts/PingFang.ttc",
                "/System/Library/Fonts/STHeiti Medium.ttc",
                "C:\\Windows\\Fonts\\msyhbd.ttc",
                "C:\\Windows\\Fonts\\msyh.ttc",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                "C:\\Windows\\Fonts\\arialbd.ttf",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            photo_count: 12,
            window_size: (1280, 800),
            compact_width: 700,
            loading_delay: Duration::from_secs(2),
            scene: SceneConfig::default(),
            blend: BlendConfig::default(),
            gesture: GestureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads overrides from `MEMORY_TREE_ASSETS`, `MEMORY_TREE_CAPTIONS`,
    /// `MEMORY_TREE_FONT` and `MEMORY_TREE_PHOTOS`, falling back to the
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("MEMORY_TREE_ASSETS") {
            config.asset_dir = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var("MEMORY_TREE_CAPTIONS") {
            config.caption_file = PathBuf::from(file);
        }
        if let Ok(font) = std::env::var("MEMORY_TREE_FONT") {
            config = config.with_caption_font(font);
        }
        if let Ok(count) = std::env::var("MEMORY_TREE_PHOTOS") {
            match count.trim().parse::<usize>() {
                Ok(count) => config.photo_count = count,
                Err(err) => log::warn!("Ignoring MEMORY_TREE_PHOTOS={count:?}: {err}"),
            }
        }
        config
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Tries `path` before every other caption font.
    pub fn with_caption_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.caption_fonts.insert(0, path.into());
        self
    }

    pub fn with_photo_count(mut self, count: usize) -> Self {
        self.photo_count = count;
        self
    }
}

/// Converts `0xRRGGBB` into linear-ish RGBA floats.
pub fn hex_color(hex: u32) -> [f32; 4] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(0xff0000), [1.0, 0.0, 0.0, 1.0]);
        let c = hex_color(0x217a46);
        assert!((c[1] - 0x7a as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_setter_keeps_band_ordered() {
        let config = GestureConfig::default().with_thresholds(1.8, 1.1);
        assert_eq!(config.close_threshold, 1.1);
        assert_eq!(config.open_threshold, 1.8);
    }

    #[test]
    fn test_caption_font_override_goes_first() {
        let config = AppConfig::default().with_caption_font("my.ttf");
        assert_eq!(config.caption_fonts[0], PathBuf::from("my.ttf"));
        assert_eq!(
            config.caption_fonts.len(),
            AppConfig::default().caption_fonts.len() + 1
        );
    }

    #[test]
    fn test_scene_count_override() {
        let config = SceneConfig::default().with_count(OrnamentKind::Photo, 3);
        assert_eq!(config.count_of(OrnamentKind::Photo), 3);
        assert_eq!(config.count_of(OrnamentKind::Sphere), 120);
    }
}
