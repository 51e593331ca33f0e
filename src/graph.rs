//! Live media-graph wrapper.
//!
//! Everything that touches the running engine lives here: launching the
//! pipeline from a [`PipelineSpec`], resolving the named compositor pads and
//! caps filter, pushing geometry, and surfacing bus traffic as
//! [`GraphEvent`]s. The rest of the crate only sees descriptors and traits.

use std::sync::Arc;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;
use thiserror::Error;

use crate::compositor::{Eye, GeometrySink};
use crate::pipeline::{PipelineSpec, CAPS_NAME, MIXER_NAME};
use crate::registry::RenderTargetRegistry;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("failed to parse launch description: {0}")]
    Parse(#[from] gst::glib::Error),
    #[error("launch description did not produce a pipeline")]
    NotAPipeline,
    #[error("pipeline has no element named {0}")]
    MissingElement(&'static str),
    #[error("element {element} has no pad {pad}")]
    MissingPad {
        element: &'static str,
        pad: &'static str,
    },
    #[error("pipeline state change failed: {0}")]
    StateChange(#[from] gst::StateChangeError),
}

/// Terminal and binding events surfaced from the engine's bus.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    StreamEnded,
    Error {
        message: String,
        detail: Option<String>,
    },
    BindFailed(String),
}

/// A launched (but not yet playing) stereo pipeline.
pub struct StereoGraph {
    pipeline: gst::Pipeline,
    caps_filter: gst::Element,
    left_pad: gst::Pad,
    right_pad: gst::Pad,
}

impl StereoGraph {
    /// Parse and construct the pipeline described by `spec` and resolve the
    /// elements the geometry controller drives.
    pub fn launch(spec: &PipelineSpec) -> Result<Self, GraphError> {
        let launch = spec.launch_string();
        log::debug!("launching pipeline: {launch}");

        let pipeline = gst::parse::launch(&launch)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| GraphError::NotAPipeline)?;

        let mixer = pipeline
            .by_name(MIXER_NAME)
            .ok_or(GraphError::MissingElement(MIXER_NAME))?;
        let caps_filter = pipeline
            .by_name(CAPS_NAME)
            .ok_or(GraphError::MissingElement(CAPS_NAME))?;
        let pad = |name: &'static str| {
            mixer.static_pad(name).ok_or(GraphError::MissingPad {
                element: MIXER_NAME,
                pad: name,
            })
        };

        Ok(Self {
            pipeline,
            caps_filter,
            left_pad: pad("sink_0")?,
            right_pad: pad("sink_1")?,
        })
    }

    pub fn play(&self) -> Result<(), GraphError> {
        self.pipeline.set_state(gst::State::Playing)?;
        log::info!("pipeline created and started");
        Ok(())
    }

    pub fn stop(&self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            log::warn!("failed to stop pipeline: {err}");
        }
    }

    /// Install the blocking surface-binding handler on the bus. The engine
    /// waits for this to complete before rendering to the surface, so the
    /// lookup and the handle call happen synchronously on its thread.
    pub fn install_bind_handler<F>(&self, registry: Arc<RenderTargetRegistry>, notify: F)
    where
        F: Fn(GraphEvent) + Send + Sync + 'static,
    {
        let bus = self.bus();
        bus.set_sync_handler(move |_, message| {
            let is_prepare = message
                .structure()
                .map(|s| s.name() == "prepare-window-handle")
                .unwrap_or(false);
            if !is_prepare {
                return gst::BusSyncReply::Pass;
            }

            let Some(element) = message
                .src()
                .and_then(|src| src.downcast_ref::<gst::Element>())
            else {
                return gst::BusSyncReply::Pass;
            };
            let name = element.name();

            match registry.window_id(name.as_str()) {
                Ok(window_id) => {
                    if let Some(overlay) = element.dynamic_cast_ref::<gst_video::VideoOverlay>() {
                        unsafe { overlay.set_window_handle(window_id as usize) };
                        log::info!("bound render target {name}");
                    } else {
                        log::error!("render target {name} does not support window binding");
                        notify(GraphEvent::BindFailed(name.to_string()));
                    }
                }
                Err(err) => {
                    log::error!("{err}");
                    notify(GraphEvent::BindFailed(name.to_string()));
                }
            }
            gst::BusSyncReply::Drop
        });
    }

    /// Watch the bus for terminal messages from a background thread.
    pub fn spawn_bus_watch<F>(&self, notify: F) -> std::thread::JoinHandle<()>
    where
        F: Fn(GraphEvent) + Send + 'static,
    {
        let bus = self.bus();
        std::thread::spawn(move || {
            for message in bus.iter_timed(gst::ClockTime::NONE) {
                match message.view() {
                    gst::MessageView::Eos(..) => {
                        notify(GraphEvent::StreamEnded);
                        break;
                    }
                    gst::MessageView::Error(err) => {
                        notify(GraphEvent::Error {
                            message: err.error().to_string(),
                            detail: err.debug().map(|d| d.to_string()),
                        });
                        break;
                    }
                    _ => {}
                }
            }
        })
    }

    fn bus(&self) -> gst::Bus {
        self.pipeline.bus().expect("pipeline always has a bus")
    }
}

impl GeometrySink for StereoGraph {
    fn clear_format(&mut self) {
        // Lift the constraint entirely before installing the new format.
        self.caps_filter.set_property("caps", gst::Caps::new_any());
    }

    fn set_format(&mut self, width: i32, height: i32) {
        let caps = gst::Caps::builder("video/x-raw")
            .field("width", width)
            .field("height", height)
            .build();
        self.caps_filter.set_property("caps", caps);
    }

    fn set_eye_position(&mut self, eye: Eye, x: i32, y: i32) {
        let pad = match eye {
            Eye::Left => &self.left_pad,
            Eye::Right => &self.right_pad,
        };
        pad.set_property("xpos", x);
        pad.set_property("ypos", y);
    }
}
