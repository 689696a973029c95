//! Hand-gesture control: landmark processing, the camera session that feeds
//! it, and a synthetic backend.

pub mod processor;
pub mod session;
pub mod synthetic;

pub use processor::{
    FrameSize, GesturePhase, GestureProcessorState, HandLandmarks, HandSignal, Hysteresis,
};
pub use session::{CameraSource, GestureLink, GestureStatus, HandEstimator, VideoFrame};
pub use synthetic::{SyntheticCamera, SyntheticHand};
