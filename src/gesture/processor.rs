//! # Gesture Signal Processor
//!
//! Turns raw per-frame hand landmarks into a debounced [`HandSignal`].
//!
//! ```text
//!             landmarks                      > miss_limit misses
//!   NoHand ─────────────► HandPresent ─────────────────────────► NoHand
//!                          │ Closed ◄── ratio < close ── Open │
//!                          │ Closed ── ratio > open ──► Open  │
//! ```
//!
//! All state lives in [`GestureProcessorState`], which callers own and thread
//! through every call. The processor never sleeps or rate limits on its own;
//! that belongs to the session driving it.

use std::collections::VecDeque;

use cgmath::{InnerSpace, Vector2};

use crate::config::GestureConfig;

/// Number of landmarks produced per hand.
pub const LANDMARK_COUNT: usize = 21;
pub const WRIST: usize = 0;
/// Index, middle, ring and pinky fingertips.
pub const FINGER_TIPS: [usize; 4] = [8, 12, 16, 20];
/// Knuckles matching [`FINGER_TIPS`].
pub const FINGER_BASES: [usize; 4] = [5, 9, 13, 17];

/// One hand's landmarks in video-pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    pub points: [Vector2<f32>; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Vector2<f32>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// A stylised hand: four fingers fanned upward from `wrist`, knuckles
    /// `knuckle_length` pixels out and fingertips `spread` times further.
    pub fn fanned(wrist: Vector2<f32>, knuckle_length: f32, spread: f32) -> Self {
        let mut points = [wrist; LANDMARK_COUNT];
        for (finger, (&tip, &base)) in FINGER_TIPS.iter().zip(FINGER_BASES.iter()).enumerate() {
            // Pixel y grows downward, so negative angles point up.
            let angle = -1.0 - finger as f32 * 0.3;
            let dir = Vector2::new(angle.cos(), angle.sin());
            points[base] = wrist + dir * knuckle_length;
            points[tip] = wrist + dir * knuckle_length * spread;
        }
        Self { points }
    }

    pub fn wrist(&self) -> Vector2<f32> {
        self.points[WRIST]
    }

    /// Wrist-to-fingertip distance over wrist-to-knuckle distance, summed
    /// over four fingers. Roughly 1 for a fist, 2 for a spread hand.
    pub fn openness_ratio(&self) -> f32 {
        let wrist = self.wrist();
        let (tips, bases) = FINGER_TIPS.iter().zip(FINGER_BASES.iter()).fold(
            (0.0, 0.0),
            |(tips, bases), (&tip, &base)| {
                (
                    tips + (self.points[tip] - wrist).magnitude(),
                    bases + (self.points[base] - wrist).magnitude(),
                )
            },
        );
        let bases = if bases == 0.0 { 1.0 } else { bases };
        tips / bases
    }
}

/// Dimensions of the video frame the landmarks were measured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: f32,
    pub height: f32,
}

impl FrameSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Maps a pixel coordinate into scene space: both axes to [-1, 1],
    /// x mirrored so the hand moves like a reflection, y pointing up.
    pub fn to_scene(&self, pixel: Vector2<f32>) -> Vector2<f32> {
        let w = if self.width > 0.0 { self.width } else { 1.0 };
        let h = if self.height > 0.0 { self.height } else { 1.0 };
        Vector2::new(-((pixel.x / w) * 2.0 - 1.0), -((pixel.y / h) * 2.0 - 1.0))
    }
}

/// Latest interpreted gesture state. A plain snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSignal {
    pub is_open: bool,
    /// Smoothed pointer in [-1, 1]²
    pub position: Vector2<f32>,
    pub is_detected: bool,
}

impl Default for HandSignal {
    fn default() -> Self {
        Self {
            is_open: false,
            position: Vector2::new(0.0, 0.0),
            is_detected: false,
        }
    }
}

/// Coarse state of the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    NoHand,
    Open,
    Closed,
}

/// Dual-threshold latch.
///
/// Opens when the value rises strictly above `open`, closes when it falls
/// strictly below `close`, and holds its state anywhere in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hysteresis {
    pub close: f32,
    pub open: f32,
    state: bool,
}

impl Hysteresis {
    pub fn new(close: f32, open: f32) -> Self {
        Self {
            close: close.min(open),
            open: open.max(close),
            state: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state
    }

    pub fn update(&mut self, value: f32) -> bool {
        if !self.state && value > self.open {
            self.state = true;
        } else if self.state && value < self.close {
            self.state = false;
        }
        self.state
    }

    pub fn reset(&mut self) {
        self.state = false;
    }
}

/// Rolling buffers, hysteresis latch and debounce counter of one camera session.
#[derive(Debug, Clone)]
pub struct GestureProcessorState {
    config: GestureConfig,
    ratio_history: VecDeque<f32>,
    position_history: VecDeque<Vector2<f32>>,
    latch: Hysteresis,
    missed: u32,
    signal: HandSignal,
}

impl GestureProcessorState {
    pub fn new(config: GestureConfig) -> Self {
        let latch = Hysteresis::new(config.close_threshold, config.open_threshold);
        Self {
            ratio_history: VecDeque::with_capacity(config.ratio_window),
            position_history: VecDeque::with_capacity(config.position_window),
            latch,
            missed: 0,
            signal: HandSignal::default(),
            config,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Last emitted signal.
    pub fn signal(&self) -> HandSignal {
        self.signal
    }

    pub fn phase(&self) -> GesturePhase {
        match (self.signal.is_detected, self.signal.is_open) {
            (false, _) => GesturePhase::NoHand,
            (true, true) => GesturePhase::Open,
            (true, false) => GesturePhase::Closed,
        }
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed
    }

    /// Average of the ratio window, if any ratio has been seen.
    pub fn smoothed_ratio(&self) -> Option<f32> {
        if self.ratio_history.is_empty() {
            return None;
        }
        Some(self.ratio_history.iter().sum::<f32>() / self.ratio_history.len() as f32)
    }

    /// Feeds one frame. `None` means the estimator found no hand.
    pub fn process_frame(&mut self, sample: Option<(&HandLandmarks, FrameSize)>) -> HandSignal {
        match sample {
            Some((landmarks, frame)) => {
                self.missed = 0;
                let position = self.push_position(frame.to_scene(landmarks.wrist()));
                let is_open = self.push_ratio(landmarks.openness_ratio());
                if !self.signal.is_detected {
                    log::info!("Hand detected");
                }
                self.signal = HandSignal {
                    is_open,
                    position,
                    is_detected: true,
                };
            }
            None => {
                self.missed = self.missed.saturating_add(1);
                if self.missed > self.config.miss_limit && self.signal.is_detected {
                    log::info!("Hand lost after {} missed frames", self.missed);
                    self.clear();
                }
            }
        }
        self.signal
    }

    /// Pushes a raw openness ratio and returns the latched open state.
    pub fn push_ratio(&mut self, ratio: f32) -> bool {
        push_window(&mut self.ratio_history, ratio, self.config.ratio_window);
        match self.smoothed_ratio() {
            Some(smoothed) => self.latch.update(smoothed),
            None => self.latch.is_open(),
        }
    }

    fn push_position(&mut self, position: Vector2<f32>) -> Vector2<f32> {
        push_window(&mut self.position_history, position, self.config.position_window);
        let sum = self
            .position_history
            .iter()
            .fold(Vector2::new(0.0, 0.0), |acc, p| acc + *p);
        sum / self.position_history.len() as f32
    }

    /// Back to `NoHand` with empty buffers. Called when the session ends.
    pub fn reset(&mut self) {
        self.clear();
        self.missed = 0;
    }

    fn clear(&mut self) {
        self.ratio_history.clear();
        self.position_history.clear();
        self.latch.reset();
        self.signal = HandSignal::default();
    }
}

impl Default for GestureProcessorState {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

fn push_window<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    window.push_back(value);
    while window.len() > capacity.max(1) {
        window.pop_front();
    }
}
