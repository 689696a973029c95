//! # Camera session
//!
//! Runs hand-pose inference off the render thread.
//!
//! A [`GestureLink`] owns the estimator. The model is loaded once on a
//! background thread; until that finishes the link reports
//! [`GestureStatus::LoadingModel`] and refuses to start a camera, so inference
//! can never run against a model that isn't there.
//!
//! Each call to [`GestureLink::start`] spawns a worker that owns its own
//! [`GestureProcessorState`] and camera. The worker paces inference to
//! `GestureConfig::interval` and posts results over an unbounded channel. The
//! render loop calls [`GestureLink::poll`] once per frame and reads the last
//! completed [`HandSignal`]; it never waits on inference.
//!
//! Cancellation is two-fold: the worker's stop flag ends its loop, and every
//! event carries the generation of the session that produced it so that a
//! result finishing after [`GestureLink::stop`] is dropped on arrival.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::GestureConfig;
use crate::error::GestureError;
use crate::gesture::processor::{FrameSize, GestureProcessorState, HandLandmarks, HandSignal};

/// Longest single sleep of the worker, so a stop request is noticed quickly.
const MAX_SLEEP: Duration = Duration::from_millis(10);

/// One captured video frame. Pixels stay with the camera; estimators receive
/// the frame by reference and may ask the source for whatever they need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFrame {
    pub size: FrameSize,
    /// Sequence number within the session
    pub index: u64,
    /// Time since the camera started
    pub elapsed: Duration,
}

/// Video capture boundary.
pub trait CameraSource: Send {
    /// Opens the device. Failure means "camera unavailable".
    fn start(&mut self) -> Result<FrameSize, GestureError>;

    /// Latest frame, or `None` while the stream isn't producing yet.
    fn grab(&mut self) -> Option<VideoFrame>;

    fn stop(&mut self);
}

/// Pretrained hand-pose model boundary.
pub trait HandEstimator: Send {
    fn load(&mut self) -> Result<(), GestureError>;

    /// Landmarks of at most one hand, `Ok(None)` if there is none.
    fn estimate(&mut self, frame: &VideoFrame) -> Result<Option<HandLandmarks>, GestureError>;
}

/// What the status surface shows about gesture control.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureStatus {
    LoadingModel,
    ModelFailed(String),
    /// Model loaded, camera off
    Ready,
    Starting,
    Active,
    CameraUnavailable(String),
}

impl GestureStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, GestureStatus::Starting | GestureStatus::Active)
    }
}

#[derive(Debug)]
enum GestureEvent {
    ModelLoaded(Result<(), GestureError>),
    CameraStarted { generation: u64 },
    CameraFailed { generation: u64, error: GestureError },
    Signal { generation: u64, signal: HandSignal },
}

type SharedEstimator = Arc<Mutex<Box<dyn HandEstimator>>>;

struct Worker {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Render-thread handle onto the gesture pipeline.
pub struct GestureLink {
    config: GestureConfig,
    estimator: SharedEstimator,
    sender: UnboundedSender<GestureEvent>,
    receiver: UnboundedReceiver<GestureEvent>,
    status: GestureStatus,
    signal: HandSignal,
    generation: u64,
    worker: Option<Worker>,
}

impl GestureLink {
    /// Takes ownership of the estimator and starts loading its model.
    pub fn new(estimator: Box<dyn HandEstimator>, config: GestureConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        let estimator: SharedEstimator = Arc::new(Mutex::new(estimator));

        let loader = Arc::clone(&estimator);
        let loaded = sender.clone();
        log::info!("Loading hand-pose model");
        thread::spawn(move || {
            let result = match loader.lock() {
                Ok(mut estimator) => estimator.load(),
                Err(_) => Err(GestureError::ModelLoad("estimator lock poisoned".into())),
            };
            let _ = loaded.unbounded_send(GestureEvent::ModelLoaded(result));
        });

        Self {
            config,
            estimator,
            sender,
            receiver,
            status: GestureStatus::LoadingModel,
            signal: HandSignal::default(),
            generation: 0,
            worker: None,
        }
    }

    pub fn status(&self) -> &GestureStatus {
        &self.status
    }

    /// Last completed signal of the current session.
    pub fn signal(&self) -> HandSignal {
        self.signal
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn model_ready(&self) -> bool {
        !matches!(
            self.status,
            GestureStatus::LoadingModel | GestureStatus::ModelFailed(_)
        )
    }

    /// Drains pending events. Call once per rendered frame.
    pub fn poll(&mut self) -> HandSignal {
        while let Ok(Some(event)) = self.receiver.try_next() {
            self.apply(event);
        }
        self.signal
    }

    fn apply(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::ModelLoaded(Ok(())) => {
                log::info!("Hand-pose model ready");
                if self.status == GestureStatus::LoadingModel {
                    self.status = GestureStatus::Ready;
                }
            }
            GestureEvent::ModelLoaded(Err(err)) => {
                log::error!("{err}; gesture control disabled");
                self.status = GestureStatus::ModelFailed(err.to_string());
            }
            GestureEvent::CameraStarted { generation } if generation == self.generation => {
                if self.status == GestureStatus::Starting {
                    self.status = GestureStatus::Active;
                }
            }
            GestureEvent::CameraFailed { generation, error } if generation == self.generation => {
                log::warn!("{error}");
                self.status = GestureStatus::CameraUnavailable(error.to_string());
                self.signal = HandSignal::default();
                self.worker = None;
            }
            GestureEvent::Signal { generation, signal } if generation == self.generation => {
                if self.status.is_active() {
                    self.signal = signal;
                }
            }
            stale => log::debug!("Dropping stale gesture event {stale:?}"),
        }
    }

    /// Opens `camera` and begins inference. Refused until the model has loaded.
    pub fn start(&mut self, camera: Box<dyn CameraSource>) -> Result<(), GestureError> {
        self.poll();
        if !self.model_ready() {
            return Err(GestureError::NotReady);
        }
        self.stop();

        self.generation += 1;
        let generation = self.generation;
        let stop = Arc::new(AtomicBool::new(false));
        let context = WorkerContext {
            generation,
            config: self.config.clone(),
            estimator: Arc::clone(&self.estimator),
            sender: self.sender.clone(),
            stop: Arc::clone(&stop),
        };
        let handle = thread::Builder::new()
            .name(format!("gesture-{generation}"))
            .spawn(move || context.run(camera))
            .map_err(|err| GestureError::CameraUnavailable(err.to_string()))?;

        log::info!("Camera session {generation} starting");
        self.status = GestureStatus::Starting;
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Ends the current session. Detection is cleared immediately and any
    /// result still in flight is discarded.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            // The worker exits on its own; joining could stall on a slow estimate.
            drop(worker.handle);
            log::info!("Camera session {} stopped", self.generation);
        }
        // Bumping the generation invalidates everything already queued.
        self.generation += 1;
        self.signal = HandSignal::default();
        if self.status.is_active() || matches!(self.status, GestureStatus::CameraUnavailable(_)) {
            self.status = GestureStatus::Ready;
        }
    }

    /// Starts when idle, stops when running.
    pub fn toggle(&mut self, camera: impl FnOnce() -> Box<dyn CameraSource>) -> Result<(), GestureError> {
        if self.is_active() {
            self.stop();
            Ok(())
        } else {
            self.start(camera())
        }
    }
}

impl Drop for GestureLink {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
        }
    }
}

struct WorkerContext {
    generation: u64,
    config: GestureConfig,
    estimator: SharedEstimator,
    sender: UnboundedSender<GestureEvent>,
    stop: Arc<AtomicBool>,
}

impl WorkerContext {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn send(&self, event: GestureEvent) -> bool {
        self.sender.unbounded_send(event).is_ok()
    }

    fn run(self, mut camera: Box<dyn CameraSource>) {
        let generation = self.generation;
        match camera.start() {
            Ok(size) => log::debug!(
                "Camera session {generation} streaming at {}x{}",
                size.width,
                size.height
            ),
            Err(error) => {
                self.send(GestureEvent::CameraFailed { generation, error });
                return;
            }
        }
        if !self.send(GestureEvent::CameraStarted { generation }) {
            camera.stop();
            return;
        }

        let mut state = GestureProcessorState::new(self.config.clone());
        let mut last_run: Option<Instant> = None;

        while !self.stopped() {
            if let Some(last) = last_run {
                let due = last + self.config.interval;
                let now = Instant::now();
                if now < due {
                    thread::sleep((due - now).min(MAX_SLEEP));
                    continue;
                }
            }

            let Some(frame) = camera.grab() else {
                thread::sleep(MAX_SLEEP);
                continue;
            };
            if frame.size.width <= 0.0 || frame.size.height <= 0.0 {
                thread::sleep(MAX_SLEEP);
                continue;
            }
            last_run = Some(Instant::now());

            let estimate = match self.estimator.lock() {
                Ok(mut estimator) => estimator.estimate(&frame),
                Err(_) => Err(GestureError::Inference("estimator lock poisoned".into())),
            };
            if self.stopped() {
                break;
            }

            let landmarks = match estimate {
                Ok(landmarks) => landmarks,
                Err(err) => {
                    // A failed frame is ignored outright and does not count as a miss.
                    log::debug!("Skipping frame {}: {err}", frame.index);
                    continue;
                }
            };
            let signal = state.process_frame(landmarks.as_ref().map(|hand| (hand, frame.size)));
            if !self.send(GestureEvent::Signal { generation, signal }) {
                break;
            }
        }

        state.reset();
        camera.stop();
    }
}
