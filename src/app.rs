//! Event loop, window set and key handling.
//!
//! A single winit event loop owns all mutable state. The graph's worker
//! threads report back through two paths: the blocking surface-bind handler
//! installed on the bus, and terminal bus messages forwarded onto the loop
//! as user events by a watcher thread. Every geometry key immediately
//! recomputes and pushes; quit keys, stream end and graph errors all take
//! the one terminal transition out of the loop.

use std::sync::Arc;

use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::compositor::CompositorController;
use crate::config::StreamConfig;
use crate::display::DisplayTarget;
use crate::graph::{GraphEvent, StereoGraph};
use crate::inhibit;
use crate::pipeline::{viewport_target, PipelineSpec, GOGGLES_TARGET};
use crate::registry::RenderTargetRegistry;

pub const APP_NAME: &str = "stereostream";

/// Viewport windows are tiled left to right at this step. Large viewport
/// counts run off-screen; that is accepted behavior.
const VIEWPORT_STEP_X: i32 = 32;
const VIEWPORT_DEFAULT_SIZE: (u32, u32) = (640, 480);

enum AppState {
    Uninitialized,
    Running {
        // Windows must outlive the graph's bound surfaces.
        #[allow(dead_code)]
        windows: Vec<(String, Window)>,
        graph: StereoGraph,
        controller: CompositorController,
    },
}

/// Main application handler driving the stereo stream.
pub struct StereoApp {
    config: StreamConfig,
    target: DisplayTarget,
    spec: PipelineSpec,
    proxy: EventLoopProxy<GraphEvent>,
    state: AppState,
}

impl StereoApp {
    pub fn new(
        config: StreamConfig,
        target: DisplayTarget,
        spec: PipelineSpec,
        proxy: EventLoopProxy<GraphEvent>,
    ) -> Self {
        Self {
            config,
            target,
            spec,
            proxy,
            state: AppState::Uninitialized,
        }
    }

    fn create_windows(&self, event_loop: &ActiveEventLoop) -> Vec<(String, Window)> {
        let mut windows = Vec::new();

        let goggles_attributes = WindowAttributes::default()
            .with_title(APP_NAME)
            .with_decorations(false)
            .with_position(PhysicalPosition::new(
                self.target.origin_x,
                self.target.origin_y,
            ))
            .with_inner_size(PhysicalSize::new(self.target.width, self.target.height))
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        let goggles = event_loop
            .create_window(goggles_attributes)
            .expect("failed to create goggle window");
        windows.push((GOGGLES_TARGET.to_string(), goggles));

        for index in 0..self.config.viewports {
            let name = viewport_target(index);
            let attributes = WindowAttributes::default()
                .with_title(name.clone())
                .with_position(PhysicalPosition::new(index * VIEWPORT_STEP_X, 0))
                .with_inner_size(PhysicalSize::new(
                    VIEWPORT_DEFAULT_SIZE.0,
                    VIEWPORT_DEFAULT_SIZE.1,
                ));
            let window = event_loop
                .create_window(attributes)
                .expect("failed to create viewport window");
            windows.push((name, window));
        }

        windows
    }

    /// Launch the graph against the created window set and start streaming.
    fn start_graph(&self, windows: &[(String, Window)]) -> StereoGraph {
        let registry = RenderTargetRegistry::from_windows(
            windows.iter().map(|(name, window)| (name.as_str(), window)),
        )
        .unwrap_or_else(|err| {
            log::error!("{err}");
            std::process::exit(1);
        });
        let registry = Arc::new(registry);

        let graph = StereoGraph::launch(&self.spec).unwrap_or_else(|err| {
            log::error!("failed to build pipeline: {err}");
            std::process::exit(1);
        });

        // The bind handler runs on the engine's threads and must be Sync;
        // the proxy is serialized behind a lock.
        let bind_proxy = Mutex::new(self.proxy.clone());
        graph.install_bind_handler(registry, move |event| {
            let _ = bind_proxy.lock().send_event(event);
        });

        let watch_proxy = self.proxy.clone();
        // Detached; it ends with the first terminal message or the process.
        let _ = graph.spawn_bus_watch(move |event| {
            let _ = watch_proxy.send_event(event);
        });

        graph
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        let AppState::Running {
            graph, controller, ..
        } = &mut self.state
        else {
            return;
        };

        match key {
            KeyCode::Escape | KeyCode::KeyQ => {
                log::info!("quit requested");
                event_loop.exit();
            }
            KeyCode::ArrowLeft => {
                controller.update(graph, |state| state.nudge_offset(-4));
            }
            KeyCode::ArrowRight => {
                controller.update(graph, |state| state.nudge_offset(4));
            }
            KeyCode::ArrowUp => {
                controller.update(graph, |state| state.step_scale(-5));
            }
            KeyCode::ArrowDown => {
                controller.update(graph, |state| state.step_scale(5));
            }
            KeyCode::BracketLeft => {
                controller.update(graph, |state| state.adjust_anchors(-1));
            }
            KeyCode::BracketRight => {
                controller.update(graph, |state| state.adjust_anchors(1));
            }
            _ => {}
        }
    }
}

impl ApplicationHandler<GraphEvent> for StereoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let AppState::Uninitialized = self.state {
            let windows = self.create_windows(event_loop);
            let mut graph = self.start_graph(&windows);

            let mut controller = CompositorController::new(self.config.default_scale, &self.target);
            controller.apply(&mut graph);

            if let Err(err) = graph.play() {
                log::error!("failed to start pipeline: {err}");
                std::process::exit(1);
            }

            inhibit::inhibit_screensaver(APP_NAME, "Streaming");

            self.state = AppState::Running {
                windows,
                graph,
                controller,
            };
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed, exiting");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: GraphEvent) {
        match event {
            GraphEvent::StreamEnded => {
                log::info!("stream ended");
            }
            GraphEvent::Error { message, detail } => {
                log::error!("pipeline error: {message}");
                if let Some(detail) = detail {
                    log::error!("{detail}");
                }
            }
            GraphEvent::BindFailed(name) => {
                log::error!("could not bind render target {name}");
            }
        }
        event_loop.exit();
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let AppState::Running { graph, .. } = &self.state {
            graph.stop();
        }
    }
}
