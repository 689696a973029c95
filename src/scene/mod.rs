//! # Scene Composition
//!
//! Owns every blended object of the memory tree and pushes their poses to a
//! [`RenderSurface`] once per frame. Photos and captions reach the surface as
//! images keyed by [`TextureKey`], uploaded the first time they are needed.
//!
//! The scene is made of
//! - one ornament group per [`OrnamentKind`], each slot with its own blend,
//! - the foliage particles filling the tree body, blended the same way,
//! - the decorative rope and the items hanging from it, which only sway.
//!
//! All blends read the same mix factor from [`MixControl`], so every group
//! assembles and scatters in lockstep. The scene never reads anything back
//! from the surface.

use cgmath::{Quaternion, Vector2, Vector3};
use image::RgbaImage;
use rand::Rng;

use crate::assets::{CaptionRasterizer, FrameGeometry, PhotoAsset};
use crate::blend::{tick_all, OrnamentBlend, Pose, ViewContext};
use crate::config::{hex_color, BlendConfig, SceneConfig};
use crate::gesture::HandSignal;
use crate::layout::rope::{HangingItem, HangingKind, Rope};
use crate::layout::{compute_foliage, compute_layout_with, OrnamentKind, OrnamentSlot, SlotStyle};

/// Geometry a pose is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Sphere,
    Cube,
    Star,
    Rod,
    Crystal,
    Cone,
    /// Low-poly particle of the tree body
    Particle,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::Sphere,
        Shape::Cube,
        Shape::Star,
        Shape::Rod,
        Shape::Crystal,
        Shape::Cone,
        Shape::Particle,
    ];

    pub fn for_kind(kind: OrnamentKind) -> Shape {
        match kind {
            OrnamentKind::Sphere => Shape::Sphere,
            OrnamentKind::Box | OrnamentKind::Photo => Shape::Cube,
            OrnamentKind::Star => Shape::Star,
            OrnamentKind::Rod => Shape::Rod,
            OrnamentKind::Crystal => Shape::Crystal,
        }
    }
}

/// Stable handle of one drawn object within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Image a textured quad samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// Decoded photo, by image index
    Photo(usize),
    /// Rasterised caption, by position in the scene's caption list
    Caption(usize),
}

/// Pose sink. Implemented by the GPU renderer and by test recorders.
pub trait RenderSurface {
    /// Forget the previous frame's poses.
    fn begin_frame(&mut self);

    fn set_pose(&mut self, id: ObjectId, shape: Shape, pose: &Pose, color: [f32; 4]);

    fn has_texture(&self, key: TextureKey) -> bool;

    /// Stores `image` under `key`, replacing any earlier upload.
    fn upload_texture(&mut self, key: TextureKey, image: &RgbaImage);

    /// Draws a unit quad in the XY plane facing +Z, sampling `key` and
    /// multiplying it by `tint`.
    fn set_textured_pose(&mut self, id: ObjectId, key: TextureKey, pose: &Pose, tint: [f32; 4]);
}

/// Hands out consecutive ids while a frame is pushed.
struct FrameWriter<'a> {
    surface: &'a mut dyn RenderSurface,
    next: u32,
}

impl FrameWriter<'_> {
    fn id(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next += 1;
        id
    }

    fn solid(&mut self, shape: Shape, pose: &Pose, color: [f32; 4]) {
        let id = self.id();
        self.surface.set_pose(id, shape, pose, color);
    }

    fn textured(&mut self, key: TextureKey, pose: &Pose, tint: [f32; 4]) {
        let id = self.id();
        self.surface.set_textured_pose(id, key, pose, tint);
    }
}

/// Where the current mix target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixSource {
    Keyboard,
    Gesture,
}

/// The single shared mix target (1 = assembled, 0 = scattered).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixControl {
    target: f32,
    source: MixSource,
}

impl MixControl {
    pub fn new(target: f32) -> Self {
        Self {
            target: target.clamp(0.0, 1.0),
            source: MixSource::Keyboard,
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn source(&self) -> MixSource {
        self.source
    }

    /// Space bar: flip between assembled and scattered.
    pub fn toggle(&mut self) -> f32 {
        self.target = if self.target >= 0.5 { 0.0 } else { 1.0 };
        self.source = MixSource::Keyboard;
        log::debug!("Mix target toggled to {}", self.target);
        self.target
    }

    pub fn set(&mut self, target: f32) {
        self.target = target.clamp(0.0, 1.0);
        self.source = MixSource::Keyboard;
    }

    /// An open hand scatters, a closed hand assembles. Ignored while no hand
    /// is detected so keyboard control keeps working.
    pub fn apply_gesture(&mut self, signal: &HandSignal) {
        if !signal.is_detected {
            return;
        }
        let target = if signal.is_open { 0.0 } else { 1.0 };
        if target != self.target {
            log::debug!("Gesture set mix target to {target}");
        }
        self.target = target;
        self.source = MixSource::Gesture;
    }
}

impl Default for MixControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Hand position eased into a camera offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftPointer {
    offset: Vector2<f32>,
    /// Easing rate per second
    pub rate: f32,
    /// Horizontal gain applied to the hand position
    pub x_gain: f32,
}

impl SoftPointer {
    pub fn offset(&self) -> Vector2<f32> {
        self.offset
    }

    /// Follows the hand while it is detected and drifts back to rest otherwise.
    pub fn update(&mut self, signal: &HandSignal, delta: f32) -> Vector2<f32> {
        let goal = if signal.is_detected {
            Vector2::new(signal.position.x * self.x_gain, signal.position.y)
        } else {
            Vector2::new(0.0, 0.0)
        };
        let step = (self.rate * delta.max(0.0)).min(1.0);
        self.offset += (goal - self.offset) * step;
        self.offset
    }
}

impl Default for SoftPointer {
    fn default() -> Self {
        Self {
            offset: Vector2::new(0.0, 0.0),
            rate: 3.0,
            x_gain: 1.2,
        }
    }
}

const FRAME_COLOR: u32 = 0xfefefe;
const PICTURE_TINT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const CAPTION_TINT: [f32; 4] = [1.0, 1.0, 1.0, 0.9];
const ROPE_COLOR: u32 = 0xc9a227;
const HAT_COLOR: u32 = 0xb22222;
const SOCK_COLOR: u32 = 0xf5f5f5;
const ROPE_BEAD_SCALE: f32 = 0.08;

/// Every blended and swaying object of the tree.
pub struct SceneComposition {
    groups: Vec<(OrnamentKind, Vec<OrnamentBlend>)>,
    foliage: Vec<OrnamentBlend>,
    rope: Rope,
    photos: Vec<Option<PhotoAsset>>,
    frames: Vec<FrameGeometry>,
    captions: Vec<String>,
    caption_images: Vec<RgbaImage>,
    blend: BlendConfig,
    elapsed: f32,
}

impl SceneComposition {
    /// Builds the scene. `photo_count` images are expected to arrive later
    /// through [`resolve_photo`](Self::resolve_photo); `captions` are handed
    /// to photo ornaments cyclically.
    pub fn build<R: Rng>(
        config: &SceneConfig,
        blend: BlendConfig,
        captions: &[String],
        photo_count: usize,
        rng: &mut R,
    ) -> Self {
        let no_captions: &[String] = &[];
        let mut groups = Vec::with_capacity(config.groups.len());
        for group in &config.groups {
            let captions = if group.kind == OrnamentKind::Photo {
                captions
            } else {
                no_captions
            };
            let style = SlotStyle::from_group(group, captions)
                .with_chaos(config.chaos_radius, config.photo_ring);
            let slots = compute_layout_with(group.count, group.kind, &config.shape, &style, rng);
            let blends = slots
                .into_iter()
                .map(|slot| OrnamentBlend::new(slot, config.initial_mix))
                .collect();
            groups.push((group.kind, blends));
        }

        let foliage = compute_foliage(
            config.foliage_count,
            &config.shape,
            config.foliage_colors,
            config.chaos_radius,
            rng,
        )
        .into_iter()
        .enumerate()
        .map(|(index, particle)| {
            let scale = Vector3::new(particle.scale, particle.scale, particle.scale);
            let slot = OrnamentSlot {
                index,
                kind: OrnamentKind::Sphere,
                chaos_position: particle.chaos_position,
                target_position: particle.target_position,
                chaos_scale: scale,
                target_scale: scale,
                rotation_seed: cgmath::Euler::new(
                    cgmath::Rad(0.0),
                    cgmath::Rad(index as f32),
                    cgmath::Rad(0.0),
                ),
                chaos_tilt: 0.0,
                color: particle.color,
                caption: None,
            };
            OrnamentBlend::new(slot, config.initial_mix)
        })
        .collect();

        let rope = Rope::new(config.rope_items, photo_count, config.rope_samples, rng);

        let scene = Self {
            groups,
            foliage,
            rope,
            photos: vec![None; photo_count],
            frames: vec![FrameGeometry::default(); photo_count],
            captions: captions.to_vec(),
            caption_images: Vec::new(),
            blend,
            elapsed: 0.0,
        };
        log::info!(
            "Scene built: {}, {} foliage, {} rope items",
            scene
                .counts()
                .iter()
                .map(|(kind, n)| format!("{n} {}", kind.name()))
                .collect::<Vec<_>>()
                .join(", "),
            scene.foliage.len(),
            scene.rope.items.len()
        );
        scene
    }

    pub fn counts(&self) -> Vec<(OrnamentKind, usize)> {
        self.groups
            .iter()
            .map(|(kind, blends)| (*kind, blends.len()))
            .collect()
    }

    pub fn group(&self, kind: OrnamentKind) -> &[OrnamentBlend] {
        self.groups
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, blends)| blends.as_slice())
            .unwrap_or(&[])
    }

    pub fn foliage(&self) -> &[OrnamentBlend] {
        &self.foliage
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Makes photo `index` (and every ornament cycling onto it) visible.
    pub fn resolve_photo(&mut self, index: usize, asset: PhotoAsset) {
        let Some(slot) = self.photos.get_mut(index) else {
            log::warn!("Photo {index} is outside the {} expected", self.photos.len());
            return;
        };
        self.frames[index] = FrameGeometry::for_aspect(asset.aspect());
        *slot = Some(asset);
    }

    /// Rasterises every caption. Until this runs photo ornaments are drawn
    /// without their caption strip.
    pub fn prepare_captions(&mut self, rasterizer: &CaptionRasterizer) {
        self.caption_images = self
            .captions
            .iter()
            .map(|text| rasterizer.render(text))
            .collect();
        log::debug!("Rasterised {} captions", self.caption_images.len());
    }

    pub fn resolved_photos(&self) -> usize {
        self.photos.iter().filter(|p| p.is_some()).count()
    }

    /// Image index and frame of the photo shown by `ornament`.
    fn photo_for(&self, ornament: usize) -> Option<(usize, &FrameGeometry)> {
        if self.photos.is_empty() {
            return None;
        }
        let index = ornament % self.photos.len();
        self.photos[index]
            .as_ref()
            .map(|_| (index, &self.frames[index]))
    }

    /// Captions are handed out by slot index, the same way the layout does.
    fn caption_for(&self, slot: &OrnamentSlot) -> Option<usize> {
        if slot.caption.is_none() || self.caption_images.is_empty() {
            return None;
        }
        Some(slot.index % self.caption_images.len())
    }

    fn upload_missing(&self, surface: &mut dyn RenderSurface) {
        for (index, asset) in self.photos.iter().enumerate() {
            let Some(asset) = asset else {
                continue;
            };
            let key = TextureKey::Photo(index);
            if !surface.has_texture(key) {
                surface.upload_texture(key, &asset.image);
            }
        }
        for (index, image) in self.caption_images.iter().enumerate() {
            let key = TextureKey::Caption(index);
            if !surface.has_texture(key) {
                surface.upload_texture(key, image);
            }
        }
    }

    /// Advances every blend by one frame.
    pub fn tick(&mut self, mix_factor: f32, delta: f32, view: &ViewContext) {
        self.elapsed += delta.max(0.0);
        for (_, blends) in &mut self.groups {
            tick_all(blends, mix_factor, delta, view, &self.blend);
        }
        tick_all(&mut self.foliage, mix_factor, delta, view, &self.blend);
    }

    /// Pushes the pose of every visible object, uploading photo and
    /// caption images the surface has not seen yet.
    pub fn push_poses(&self, surface: &mut dyn RenderSurface) {
        surface.begin_frame();
        self.upload_missing(surface);
        let mut out = FrameWriter { surface, next: 0 };

        for particle in &self.foliage {
            out.solid(Shape::Particle, particle.pose(), particle.slot().color);
        }

        for (kind, blends) in &self.groups {
            for blend in blends {
                if *kind == OrnamentKind::Photo {
                    if let Some((image, frame)) = self.photo_for(blend.slot().index) {
                        let caption = self.caption_for(blend.slot());
                        framed_photo(&mut out, blend.pose(), frame, image, caption);
                    }
                } else {
                    out.solid(Shape::for_kind(*kind), blend.pose(), blend.slot().color);
                }
            }
        }

        let bead = Vector3::new(ROPE_BEAD_SCALE, ROPE_BEAD_SCALE, ROPE_BEAD_SCALE);
        for point in &self.rope.line {
            let pose = Pose::new(*point, bead, Quaternion::new(1.0, 0.0, 0.0, 0.0));
            out.solid(Shape::Sphere, &pose, hex_color(ROPE_COLOR));
        }

        for item in &self.rope.items {
            let pose = hanging_pose(item, self.elapsed);
            match item.kind {
                HangingKind::Photo { image } => {
                    if let Some((image, frame)) = self.photo_for(image) {
                        framed_photo(&mut out, &pose, frame, image, None);
                    }
                }
                HangingKind::Hat => out.solid(Shape::Cone, &pose, hex_color(HAT_COLOR)),
                HangingKind::Sock => out.solid(Shape::Cube, &pose, hex_color(SOCK_COLOR)),
            }
        }
    }
}

fn hanging_pose(item: &HangingItem, elapsed: f32) -> Pose {
    let s = item.scale();
    Pose::new(
        item.position,
        Vector3::new(s, s, s),
        Quaternion::from(item.sway(elapsed)),
    )
}

/// Frame board, picture and caption strip of one photo ornament.
fn framed_photo(
    out: &mut FrameWriter<'_>,
    parent: &Pose,
    frame: &FrameGeometry,
    image: usize,
    caption: Option<usize>,
) {
    let identity = Quaternion::new(1.0, 0.0, 0.0, 0.0);
    let [fw, fh, fd] = frame.frame;
    let [pw, ph] = frame.photo;
    let [px, py, pz] = frame.photo_offset;

    let board = parent.child(&Pose::new(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(fw, fh, fd),
        identity,
    ));
    out.solid(Shape::Cube, &board, hex_color(FRAME_COLOR));

    let picture = parent.child(&Pose::new(
        Vector3::new(px, py, pz),
        Vector3::new(pw, ph, 1.0),
        identity,
    ));
    out.textured(TextureKey::Photo(image), &picture, PICTURE_TINT);

    if let Some(caption) = caption {
        let [cx, cy, cz] = frame.caption_offset;
        let [cw, ch] = frame.caption_size;
        let strip = parent.child(&Pose::new(
            Vector3::new(cx, cy, cz),
            Vector3::new(cw, ch, 1.0),
            identity,
        ));
        out.textured(TextureKey::Caption(caption), &strip, CAPTION_TINT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        frames: usize,
        poses: Vec<(ObjectId, Shape, Pose)>,
        textured: Vec<(ObjectId, TextureKey, Pose, [f32; 4])>,
        textures: HashMap<TextureKey, RgbaImage>,
        uploads: usize,
    }

    impl RenderSurface for Recorder {
        fn begin_frame(&mut self) {
            self.frames += 1;
            self.poses.clear();
            self.textured.clear();
        }

        fn set_pose(&mut self, id: ObjectId, shape: Shape, pose: &Pose, _color: [f32; 4]) {
            self.poses.push((id, shape, *pose));
        }

        fn has_texture(&self, key: TextureKey) -> bool {
            self.textures.contains_key(&key)
        }

        fn upload_texture(&mut self, key: TextureKey, image: &RgbaImage) {
            self.uploads += 1;
            self.textures.insert(key, image.clone());
        }

        fn set_textured_pose(&mut self, id: ObjectId, key: TextureKey, pose: &Pose, tint: [f32; 4]) {
            self.textured.push((id, key, *pose, tint));
        }
    }

    impl Recorder {
        fn count(&self, shape: Shape) -> usize {
            self.poses.iter().filter(|(_, s, _)| *s == shape).count()
        }

        fn drawn(&self, key: TextureKey) -> usize {
            self.textured.iter().filter(|(_, k, _, _)| *k == key).count()
        }

        /// Pixels behind every textured quad of the frame, in draw order.
        fn drawn_pixels(&self) -> Vec<&RgbaImage> {
            self.textured
                .iter()
                .map(|(_, key, _, _)| &self.textures[key])
                .collect()
        }
    }

    fn small_config() -> SceneConfig {
        SceneConfig::default()
            .with_count(OrnamentKind::Sphere, 10)
            .with_count(OrnamentKind::Photo, 4)
            .with_foliage(50)
            .with_rope_items(6)
    }

    fn build_with(captions: &[&str], photo_count: usize) -> SceneComposition {
        let mut rng = StdRng::seed_from_u64(17);
        let captions: Vec<String> = captions.iter().map(|c| c.to_string()).collect();
        SceneComposition::build(
            &small_config(),
            BlendConfig::default(),
            &captions,
            photo_count,
            &mut rng,
        )
    }

    fn build(photo_count: usize) -> SceneComposition {
        build_with(&["one", "two"], photo_count)
    }

    fn solid_photo(color: [u8; 4]) -> PhotoAsset {
        PhotoAsset {
            path: "solid.png".into(),
            width: 8,
            height: 8,
            image: std::sync::Arc::new(RgbaImage::from_pixel(8, 8, image::Rgba(color))),
            fallback: false,
        }
    }

    fn view() -> ViewContext {
        ViewContext::new(Vector3::new(0.0, 2.0, 35.0))
    }

    #[test]
    fn test_mix_control_toggle_and_gesture() {
        let mut mix = MixControl::default();
        assert_eq!(mix.toggle(), 0.0);
        assert_eq!(mix.toggle(), 1.0);

        let mut signal = HandSignal {
            is_open: true,
            ..HandSignal::default()
        };
        mix.apply_gesture(&signal);
        assert_eq!(mix.target(), 1.0);
        assert_eq!(mix.source(), MixSource::Keyboard);

        signal.is_detected = true;
        mix.apply_gesture(&signal);
        assert_eq!(mix.target(), 0.0);
        assert_eq!(mix.source(), MixSource::Gesture);

        signal.is_open = false;
        mix.apply_gesture(&signal);
        assert_eq!(mix.target(), 1.0);
    }

    #[test]
    fn test_soft_pointer_follows_then_rests() {
        let mut pointer = SoftPointer::default();
        let signal = HandSignal {
            is_open: false,
            position: Vector2::new(0.5, -0.5),
            is_detected: true,
        };
        for _ in 0..200 {
            pointer.update(&signal, 0.016);
        }
        assert!((pointer.offset() - Vector2::new(0.6, -0.5)).magnitude() < 1e-3);
        for _ in 0..200 {
            pointer.update(&HandSignal::default(), 0.016);
        }
        assert!(pointer.offset().magnitude() < 1e-3);
    }

    #[test]
    fn test_all_groups_move_in_lockstep() {
        let mut scene = build(4);
        for _ in 0..30 {
            scene.tick(0.0, 1.0 / 60.0, &view());
        }
        let mixes: Vec<f32> = scene
            .counts()
            .iter()
            .flat_map(|(kind, _)| scene.group(*kind).iter().map(|b| b.current_mix()))
            .chain(scene.foliage().iter().map(|b| b.current_mix()))
            .collect();
        assert!(!mixes.is_empty());
        assert!(mixes.iter().all(|m| (m - mixes[0]).abs() < 1e-6));
        assert!(mixes[0] < 1.0);
    }

    #[test]
    fn test_photos_hidden_until_resolved() {
        let mut scene = build(4);
        scene.tick(1.0, 0.016, &view());
        let mut surface = Recorder::default();
        scene.push_poses(&mut surface);
        let before = surface.count(Shape::Cube);

        assert!(surface.textured.is_empty());

        scene.resolve_photo(1, PhotoAsset::placeholder(Path::new("2.jpg")));
        scene.push_poses(&mut surface);
        let after = surface.count(Shape::Cube);
        // Photo ornament 1 cycles onto image 1.
        assert!(after > before, "{before} -> {after}");
        assert!(surface.drawn(TextureKey::Photo(1)) >= 1);
        assert_eq!(surface.frames, 2);
    }

    #[test]
    fn test_textures_upload_once() {
        let mut scene = build(4);
        scene.prepare_captions(&CaptionRasterizer::default());
        scene.resolve_photo(0, PhotoAsset::placeholder(Path::new("1.jpg")));
        let mut surface = Recorder::default();
        scene.push_poses(&mut surface);
        // one photo and two captions
        assert_eq!(surface.uploads, 3);
        scene.push_poses(&mut surface);
        assert_eq!(surface.uploads, 3);

        scene.resolve_photo(2, PhotoAsset::placeholder(Path::new("3.jpg")));
        scene.push_poses(&mut surface);
        assert_eq!(surface.uploads, 4);
        assert!(surface.has_texture(TextureKey::Photo(2)));
    }

    #[test]
    fn test_caption_strips_follow_caption_text() {
        let render = |captions: &[&str]| {
            let mut scene = build_with(captions, 4);
            scene.prepare_captions(&CaptionRasterizer::default());
            for i in 0..4 {
                scene.resolve_photo(i, PhotoAsset::placeholder(Path::new("x.jpg")));
            }
            scene.tick(1.0, 0.016, &view());
            let mut surface = Recorder::default();
            scene.push_poses(&mut surface);
            surface
        };
        let short = render(&["A", "B", "C", "D", "E"]);
        let long = render(&[
            "a very long caption",
            "another long caption",
            "a third long caption",
            "the fourth long caption",
            "and a fifth long caption",
        ]);

        // Same seed, so only the strips themselves may differ.
        assert_eq!(short.poses, long.poses);
        assert!(short.drawn(TextureKey::Caption(0)) >= 1);
        let caption = TextureKey::Caption(0);
        assert_ne!(short.textures[&caption], long.textures[&caption]);
        assert_ne!(short.drawn_pixels(), long.drawn_pixels());
        assert!(short
            .textured
            .iter()
            .filter(|(_, key, _, _)| matches!(key, TextureKey::Caption(_)))
            .all(|(_, _, _, tint)| tint[3] < 1.0));
    }

    #[test]
    fn test_picture_quads_sample_their_photo() {
        let render = |color: [u8; 4]| {
            let mut scene = build(2);
            scene.resolve_photo(0, solid_photo(color));
            scene.resolve_photo(1, solid_photo([0, 0, 255, 255]));
            scene.tick(1.0, 0.016, &view());
            let mut surface = Recorder::default();
            scene.push_poses(&mut surface);
            surface
        };
        let red = render([255, 0, 0, 255]);
        let green = render([0, 255, 0, 255]);

        assert_eq!(red.poses, green.poses);
        assert!(red.drawn(TextureKey::Photo(0)) >= 1);
        assert_eq!(red.textures[&TextureKey::Photo(0)].get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_ne!(red.drawn_pixels(), green.drawn_pixels());
        assert_eq!(red.textures[&TextureKey::Photo(1)], green.textures[&TextureKey::Photo(1)]);
    }

    #[test]
    fn test_ids_are_unique_per_frame() {
        let mut scene = build(4);
        for i in 0..4 {
            scene.resolve_photo(i, PhotoAsset::placeholder(Path::new("x.jpg")));
        }
        scene.tick(0.5, 0.016, &view());
        let mut surface = Recorder::default();
        scene.push_poses(&mut surface);
        let mut seen = HashMap::new();
        let ids = surface
            .poses
            .iter()
            .map(|(id, _, _)| id)
            .chain(surface.textured.iter().map(|(id, _, _, _)| id));
        for id in ids {
            assert!(seen.insert(*id, ()).is_none(), "{id:?} reused");
        }
        assert_eq!(surface.count(Shape::Particle), 50);
        assert_eq!(surface.count(Shape::Sphere), 10 + 101);
    }

    #[test]
    fn test_rope_items_sway_independently_of_mix() {
        let mut scene = build(0);
        let mut surface = Recorder::default();
        scene.push_poses(&mut surface);
        let first: Vec<Pose> = surface.poses.iter().map(|(_, _, p)| *p).collect();

        scene.tick(1.0, 0.5, &view());
        scene.push_poses(&mut surface);
        let hanging_moved = surface
            .poses
            .iter()
            .zip(first.iter())
            .filter(|((_, shape, _), _)| *shape == Shape::Cone || *shape == Shape::Cube)
            .any(|((_, _, now), before)| now.rotation != before.rotation);
        assert!(hanging_moved);
    }

    #[test]
    fn test_out_of_range_photo_is_ignored() {
        let mut scene = build(2);
        scene.resolve_photo(9, PhotoAsset::placeholder(Path::new("10.jpg")));
        assert_eq!(scene.resolved_photos(), 0);
    }

    #[test]
    fn test_empty_scene_pushes_only_rope() {
        let config = SceneConfig {
            groups: Vec::new(),
            foliage_count: 0,
            rope_items: 0,
            ..SceneConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut scene = SceneComposition::build(&config, BlendConfig::default(), &[], 0, &mut rng);
        scene.tick(0.0, 0.016, &view());
        let mut surface = Recorder::default();
        scene.push_poses(&mut surface);
        assert_eq!(surface.poses.len(), config.rope_samples + 1);
    }
}
