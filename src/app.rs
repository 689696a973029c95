use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::{
    assets::{load_captions, photo_paths, AssetLoader, CaptionRasterizer},
    blend::ViewContext,
    config::AppConfig,
    gesture::{CameraSource, GestureLink, GestureStatus, SyntheticCamera, SyntheticHand},
    gfx::{
        camera::{
            camera_controller::CameraController, camera_utils::CameraManager,
            orbit_camera::OrbitCamera,
        },
        render_engine::RenderEngine,
    },
    scene::{MixControl, MixSource, SceneComposition, SoftPointer},
};

const TITLE: &str = "Memory Tree";

/// Frames longer than this are treated as a stall, not as elapsed time.
const MAX_FRAME_DELTA: f32 = 0.1;

/// Resolution reported by the demo camera.
const CAMERA_SIZE: (u32, u32) = (640, 480);

pub struct MemoryTreeApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: AppConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    camera_manager: CameraManager,
    scene: SceneComposition,
    mix: MixControl,
    pointer: SoftPointer,
    gesture: GestureLink,
    assets: AssetLoader,
    started: Instant,
    last_frame: Instant,
    title: String,
}

impl MemoryTreeApp {
    /// Builds the scene and starts the background work (photo decoding and
    /// hand-pose model loading). The window opens in [`run`](Self::run).
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;

        let captions = load_captions(&config.caption_file);
        let mut scene = SceneComposition::build(
            &config.scene,
            config.blend.clone(),
            &captions,
            config.photo_count,
            &mut rand::rng(),
        );
        scene.prepare_captions(&CaptionRasterizer::find(&config.caption_fonts));
        let assets = AssetLoader::spawn(photo_paths(&config.asset_dir, config.photo_count));
        let gesture = GestureLink::new(Box::new(SyntheticHand::default()), config.gesture.clone());

        let (width, height) = config.window_size;
        let camera = OrbitCamera::framing_tree(width as f32 / height.max(1) as f32);
        let camera_manager = CameraManager::new(camera, CameraController::default());

        let now = Instant::now();
        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                mix: MixControl::new(config.scene.initial_mix),
                config,
                window: None,
                render_engine: None,
                camera_manager,
                scene,
                pointer: SoftPointer::default(),
                gesture,
                assets,
                started: now,
                last_frame: now,
                title: String::new(),
            },
        })
    }

    /// Runs the event loop until the window closes.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| anyhow::anyhow!("event loop already consumed"))?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state)?;
        Ok(())
    }
}

/// Opens the window and runs the memory tree with `config`.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    MemoryTreeApp::new(config)?.run()
}

/// Text shown in the window title. `source` tells whether the hand or the
/// keyboard set the current mix target.
pub fn status_title(
    loading: Option<(usize, usize)>,
    gesture: &GestureStatus,
    source: MixSource,
) -> String {
    if let Some((done, total)) = loading {
        return format!("{TITLE} · Loading memories ({done}/{total})");
    }
    let status = match gesture {
        GestureStatus::Active if source == MixSource::Gesture => "Gesture Active".to_string(),
        GestureStatus::Active => "Gesture Active · Show your hand".to_string(),
        GestureStatus::Starting => "Starting camera…".to_string(),
        GestureStatus::CameraUnavailable(_) => "Camera Unavailable".to_string(),
        GestureStatus::ModelFailed(_) => {
            "Gesture control unavailable · Space Key to Explore".to_string()
        }
        GestureStatus::LoadingModel | GestureStatus::Ready => "Space Key to Explore".to_string(),
    };
    format!("{TITLE} · {status}")
}

impl AppState {
    fn is_loading(&self) -> bool {
        self.started.elapsed() < self.config.loading_delay || !self.assets.is_finished()
    }

    fn is_compact(&self) -> bool {
        let Some(window) = self.window.as_ref() else {
            return false;
        };
        let logical: LogicalSize<f64> = window.inner_size().to_logical(window.scale_factor());
        logical.width < self.config.compact_width as f64
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key_code: KeyCode) {
        match key_code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                let target = self.mix.toggle();
                log::debug!("Mix toggled to {target}");
            }
            KeyCode::KeyC => {
                let (width, height) = CAMERA_SIZE;
                let camera = || {
                    Box::new(SyntheticCamera::new(width, height)) as Box<dyn CameraSource>
                };
                if let Err(err) = self.gesture.toggle(camera) {
                    log::warn!("Cannot start gesture control: {err}");
                }
            }
            KeyCode::KeyF => {
                if let Some(window) = self.window.as_ref() {
                    let fullscreen = match window.fullscreen() {
                        Some(_) => None,
                        None => Some(Fullscreen::Borderless(None)),
                    };
                    window.set_fullscreen(fullscreen);
                }
            }
            KeyCode::KeyR => self.camera_manager.camera.reset_to_default(),
            _ => (),
        }
    }

    fn refresh_title(&mut self) {
        let loading = self.is_loading().then(|| self.assets.progress());
        let title = status_title(loading, self.gesture.status(), self.mix.source());
        if title != self.title {
            if let Some(window) = self.window.as_ref() {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let delta = now
            .duration_since(self.last_frame)
            .as_secs_f32()
            .min(MAX_FRAME_DELTA);
        self.last_frame = now;

        for loaded in self.assets.poll() {
            self.scene.resolve_photo(loaded.index, loaded.asset);
        }

        let signal = self.gesture.poll();
        self.mix.apply_gesture(&signal);
        let offset = self.pointer.update(&signal, delta);
        self.camera_manager.apply_pointer(offset);
        let camera_uniform = self.camera_manager.uniform();

        let view = ViewContext {
            camera_position: self.camera_manager.eye(),
            compact: self.is_compact(),
        };
        self.scene.tick(self.mix.target(), delta, &view);
        self.refresh_title();

        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };
        self.scene.push_poses(render_engine);
        if let Err(err) = render_engine.render(&camera_uniform) {
            log::error!("Frame dropped: {err}");
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let attributes = WindowAttributes::default()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        let (width, height) = window.inner_size().into();
        let window_clone = window.clone();
        match pollster::block_on(async move { RenderEngine::new(window_clone, width, height).await })
        {
            Ok(render_engine) => {
                self.camera_manager
                    .camera
                    .resize_projection(width, height);
                self.render_engine = Some(render_engine);
                self.window = Some(window);
                self.last_frame = Instant::now();
            }
            Err(err) => {
                log::error!("Failed to initialise renderer: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key_code),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.camera_manager
                    .camera
                    .resize_projection(width, height);
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
            }
            WindowEvent::Focused(false) => self.camera_manager.controller.release(),
            WindowEvent::CloseRequested => {
                self.gesture.stop();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        self.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_title_shows_progress() {
        let title = status_title(Some((3, 12)), &GestureStatus::Ready, MixSource::Keyboard);
        assert!(title.contains("Loading"));
        assert!(title.contains("3/12"));
    }

    #[test]
    fn test_loading_hides_gesture_state() {
        let title = status_title(Some((0, 1)), &GestureStatus::Active, MixSource::Gesture);
        assert!(!title.contains("Gesture Active"));
    }

    #[test]
    fn test_gesture_titles() {
        let ready = status_title(None, &GestureStatus::Ready, MixSource::Keyboard);
        assert!(ready.contains("Space Key to Explore"));
        let denied = GestureStatus::CameraUnavailable("denied".into());
        assert!(status_title(None, &denied, MixSource::Keyboard).contains("Camera Unavailable"));
    }

    #[test]
    fn test_active_title_follows_mix_source() {
        let driven = status_title(None, &GestureStatus::Active, MixSource::Gesture);
        assert_eq!(driven, format!("{TITLE} · Gesture Active"));
        let waiting = status_title(None, &GestureStatus::Active, MixSource::Keyboard);
        assert!(waiting.contains("Gesture Active"));
        assert!(waiting.contains("Show your hand"));
    }

    #[test]
    fn test_model_failure_keeps_keyboard_hint() {
        let failed = GestureStatus::ModelFailed("missing".into());
        let title = status_title(None, &failed, MixSource::Keyboard);
        assert!(title.contains("unavailable"));
        assert!(title.contains("Space Key to Explore"));
    }
}
