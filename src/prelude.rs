//! # Memory Tree Prelude
//!
//! Commonly used types in one import:
//!
//! ```no_run
//! use memory_tree::prelude::*;
//!
//! let config = AppConfig::default().with_photo_count(6);
//! let mut rng = StdRng::seed_from_u64(7);
//! let scene = SceneComposition::build(&config.scene, config.blend.clone(), &[], 6, &mut rng);
//! assert!(!scene.foliage().is_empty());
//! ```

// Application shell
pub use crate::app::MemoryTreeApp;
pub use crate::default;

// Configuration and errors
pub use crate::config::{AppConfig, BlendConfig, GestureConfig, SceneConfig, TreeShape};
pub use crate::error::{AssetError, GestureError, RenderError};

// Core
pub use crate::blend::{BlendState, OrnamentBlend, Pose, ViewContext};
pub use crate::layout::rope::{HangingKind, Rope};
pub use crate::layout::{compute_layout, OrnamentKind, OrnamentSlot};
pub use crate::scene::{
    MixControl, MixSource, ObjectId, RenderSurface, SceneComposition, Shape, TextureKey,
};

// Gesture control
pub use crate::gesture::{
    CameraSource, GestureLink, GestureProcessorState, GestureStatus, HandEstimator, HandLandmarks,
    HandSignal,
};

// Assets
pub use crate::assets::{AssetLoader, CaptionRasterizer, PhotoAsset};

// Common external dependencies
pub use cgmath::{InnerSpace, Vector2, Vector3, Zero};
pub use rand::{rngs::StdRng, SeedableRng};
