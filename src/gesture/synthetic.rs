//! Scripted stand-ins for the webcam and the hand-pose model.
//!
//! [`SyntheticHand`] produces a hand that slowly circles the frame and
//! alternates between a fist and a spread palm, with a short gap each cycle
//! where no hand is reported. It drives the demo binary and doubles as a
//! test fixture for the session worker.

use std::time::{Duration, Instant};

use cgmath::Vector2;

use crate::error::GestureError;
use crate::gesture::processor::{FrameSize, HandLandmarks};
use crate::gesture::session::{CameraSource, HandEstimator, VideoFrame};

/// A camera that yields empty frames of a fixed size.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    size: FrameSize,
    started: Option<Instant>,
    frames: u64,
    failure: Option<String>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: FrameSize::new(width as f32, height as f32),
            started: None,
            frames: 0,
            failure: None,
        }
    }

    /// A camera whose `start` always fails, as when permission is denied.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(0, 0)
        }
    }
}

impl CameraSource for SyntheticCamera {
    fn start(&mut self) -> Result<FrameSize, GestureError> {
        if let Some(reason) = &self.failure {
            return Err(GestureError::CameraUnavailable(reason.clone()));
        }
        self.started = Some(Instant::now());
        self.frames = 0;
        Ok(self.size)
    }

    fn grab(&mut self) -> Option<VideoFrame> {
        let started = self.started?;
        let frame = VideoFrame {
            size: self.size,
            index: self.frames,
            elapsed: started.elapsed(),
        };
        self.frames += 1;
        Some(frame)
    }

    fn stop(&mut self) {
        self.started = None;
    }
}

/// Periodic open/close hand.
#[derive(Debug, Clone)]
pub struct SyntheticHand {
    /// Length of one open + closed cycle
    pub period: Duration,
    /// Fraction of each cycle, at its end, with no hand in view
    pub gap: f32,
    /// Orbit radius of the wrist as a fraction of the frame
    pub orbit: f32,
    pub load_delay: Duration,
    loaded: bool,
}

impl Default for SyntheticHand {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(8),
            gap: 0.1,
            orbit: 0.25,
            load_delay: Duration::from_millis(300),
            loaded: false,
        }
    }
}

impl SyntheticHand {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap.clamp(0.0, 1.0);
        self
    }

    /// Hand landmarks at `elapsed`, or `None` inside the gap.
    pub fn pose_at(&self, elapsed: Duration, size: FrameSize) -> Option<HandLandmarks> {
        let period = self.period.as_secs_f32().max(1e-3);
        let phase = (elapsed.as_secs_f32() / period).fract();
        if phase >= 1.0 - self.gap {
            return None;
        }

        let angle = phase * std::f32::consts::TAU;
        let wrist = Vector2::new(
            size.width * (0.5 + self.orbit * angle.cos()),
            size.height * (0.6 + self.orbit * 0.5 * angle.sin()),
        );
        // First half spread, second half a fist.
        let spread = if phase < (1.0 - self.gap) / 2.0 { 2.0 } else { 1.0 };
        Some(HandLandmarks::fanned(wrist, size.height * 0.08, spread))
    }
}

impl HandEstimator for SyntheticHand {
    fn load(&mut self) -> Result<(), GestureError> {
        std::thread::sleep(self.load_delay);
        self.loaded = true;
        Ok(())
    }

    fn estimate(&mut self, frame: &VideoFrame) -> Result<Option<HandLandmarks>, GestureError> {
        if !self.loaded {
            return Err(GestureError::NotReady);
        }
        Ok(self.pose_at(frame.elapsed, frame.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_camera_fails_to_start() {
        let mut camera = SyntheticCamera::unavailable("denied");
        assert!(matches!(
            camera.start(),
            Err(GestureError::CameraUnavailable(_))
        ));
        assert!(camera.grab().is_none());
    }

    #[test]
    fn test_camera_counts_frames() {
        let mut camera = SyntheticCamera::new(640, 480);
        assert!(camera.grab().is_none());
        camera.start().unwrap();
        assert_eq!(camera.grab().unwrap().index, 0);
        assert_eq!(camera.grab().unwrap().index, 1);
        camera.stop();
        assert!(camera.grab().is_none());
    }

    #[test]
    fn test_hand_cycles_open_closed_absent() {
        let hand = SyntheticHand::default()
            .with_period(Duration::from_secs(10))
            .with_gap(0.2);
        let size = FrameSize::new(640.0, 480.0);

        let open = hand.pose_at(Duration::from_secs(1), size).unwrap();
        assert!(open.openness_ratio() > 1.6);
        let closed = hand.pose_at(Duration::from_secs(6), size).unwrap();
        assert!(closed.openness_ratio() < 1.2);
        assert!(hand.pose_at(Duration::from_secs(9), size).is_none());
    }

    #[test]
    fn test_estimate_requires_load() {
        let mut hand = SyntheticHand {
            load_delay: Duration::ZERO,
            ..SyntheticHand::default()
        };
        let frame = VideoFrame {
            size: FrameSize::new(100.0, 100.0),
            index: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(hand.estimate(&frame), Err(GestureError::NotReady));
        hand.load().unwrap();
        assert!(hand.estimate(&frame).unwrap().is_some());
    }
}
