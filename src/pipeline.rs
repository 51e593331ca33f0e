//! Processing-graph topology.
//!
//! The shape of the media graph is decided once, up front, as a typed
//! descriptor: a list of branches hanging off named duplication points. The
//! descriptor is pure data; [`PipelineSpec::launch_string`] renders it to the
//! gst-launch syntax the media engine consumes, and the topology invariants
//! (branch fan-out, render-target set) are testable without a running engine.

use thiserror::Error;

/// Name of the duplication point right after the input branch; every
/// auxiliary branch taps it and receives raw pre-scale frames.
pub const ORIGIN_TEE: &str = "orig";
/// Duplication point after scaling, feeding both compositor inputs.
pub const SPLIT_TEE: &str = "split";
/// Compositor element overlaying the two eye branches.
pub const MIXER_NAME: &str = "mixer";
/// Caps filter asserting the active per-eye frame format.
pub const CAPS_NAME: &str = "caps";
/// Render target for the primary stereo window.
pub const GOGGLES_TARGET: &str = "goggles";

/// Render target name for the i-th mirror window.
pub fn viewport_target(index: i32) -> String {
    format!("viewport{index}")
}

#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    #[error("invalid topology: viewport count {0} is negative")]
    InvalidTopology(i32),
}

/// How the incoming video reaches the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Named capture device, deinterlaced.
    DeviceCapture,
    /// Elementary H.264 bitstream on the pre-opened descriptor.
    NetworkStream,
}

impl InputKind {
    /// The literal source value `wifibroadcast` selects the network stream;
    /// anything else is a capture device path.
    pub fn from_source(input_path: &str) -> Self {
        if input_path == "wifibroadcast" {
            InputKind::NetworkStream
        } else {
            InputKind::DeviceCapture
        }
    }
}

/// One downstream path of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSpec {
    /// Duplication point feeding this branch, `None` for the source branch
    /// and for verbatim fragments that carry their own tap.
    pub tap: Option<String>,
    /// Element descriptions in upstream-to-downstream order.
    pub elements: Vec<String>,
    /// Named element this branch links into, if it does not end in a sink.
    pub feeds: Option<String>,
    /// Name of the video sink this branch renders to, if any.
    pub render_target: Option<String>,
}

/// Declarative description of the whole processing graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    branches: Vec<BranchSpec>,
}

impl PipelineSpec {
    /// Build the graph description for one input source, the goggle view,
    /// `viewports` mirror branches and an optional recording branch.
    pub fn build(
        kind: InputKind,
        device_path: &str,
        width: u32,
        height: u32,
        viewports: i32,
        dump_branch: &str,
    ) -> Result<Self, TopologyError> {
        if viewports < 0 {
            return Err(TopologyError::InvalidTopology(viewports));
        }

        let mut branches = Vec::new();

        let mut input = match kind {
            InputKind::NetworkStream => vec![
                "fdsrc".to_string(),
                "h264parse".to_string(),
                "avdec_h264".to_string(),
            ],
            InputKind::DeviceCapture => vec![
                format!("v4l2src device={device_path}"),
                "deinterlace".to_string(),
            ],
        };
        input.push(format!("tee name={ORIGIN_TEE}"));
        branches.push(BranchSpec {
            tap: None,
            elements: input,
            feeds: None,
            render_target: None,
        });

        // Scale, assert the per-eye format, split into the two compositor
        // inputs and render the composited frame full-screen.
        branches.push(BranchSpec {
            tap: Some(ORIGIN_TEE.to_string()),
            elements: vec![
                "videoscale".to_string(),
                format!("capsfilter name={CAPS_NAME}"),
                format!("tee name={SPLIT_TEE}"),
                "queue".to_string(),
                format!("compositor name={MIXER_NAME} background=black"),
                format!("video/x-raw,width={width},height={height}"),
                format!("xvimagesink double-buffer=false sync=false name={GOGGLES_TARGET}"),
            ],
            feeds: None,
            render_target: Some(GOGGLES_TARGET.to_string()),
        });
        branches.push(BranchSpec {
            tap: Some(SPLIT_TEE.to_string()),
            elements: vec!["queue".to_string()],
            feeds: Some(MIXER_NAME.to_string()),
            render_target: None,
        });

        // Mirror branches carry the full source resolution, unscaled.
        for index in 0..viewports {
            let target = viewport_target(index);
            branches.push(BranchSpec {
                tap: Some(ORIGIN_TEE.to_string()),
                elements: vec![
                    "queue".to_string(),
                    format!("xvimagesink sync=false name={target}"),
                ],
                feeds: None,
                render_target: Some(target),
            });
        }

        if !dump_branch.is_empty() {
            branches.push(BranchSpec {
                tap: None,
                elements: vec![dump_branch.to_string()],
                feeds: None,
                render_target: None,
            });
        }

        Ok(Self { branches })
    }

    pub fn branches(&self) -> &[BranchSpec] {
        &self.branches
    }

    /// Names of all video sinks, in branch order. This set must match the
    /// drawing surfaces created at startup one-to-one.
    pub fn render_targets(&self) -> Vec<&str> {
        self.branches
            .iter()
            .filter_map(|branch| branch.render_target.as_deref())
            .collect()
    }

    /// Render the descriptor to gst-launch syntax.
    pub fn launch_string(&self) -> String {
        self.branches
            .iter()
            .map(|branch| {
                let mut parts = Vec::new();
                if let Some(tap) = &branch.tap {
                    parts.push(format!("{tap}."));
                }
                parts.extend(branch.elements.iter().cloned());
                if let Some(feeds) = &branch.feeds {
                    parts.push(format!("{feeds}."));
                }
                parts.join(" ! ")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(kind: InputKind, viewports: i32, dump: &str) -> PipelineSpec {
        PipelineSpec::build(kind, "/dev/video1", 1920, 1080, viewports, dump).unwrap()
    }

    #[test]
    fn test_device_capture_input_branch() {
        let spec = build(InputKind::DeviceCapture, 0, "");
        let launch = spec.launch_string();
        assert!(launch.starts_with("v4l2src device=/dev/video1 ! deinterlace ! tee name=orig"));
    }

    #[test]
    fn test_network_stream_input_branch() {
        let spec = build(InputKind::NetworkStream, 0, "");
        let launch = spec.launch_string();
        assert!(launch.starts_with("fdsrc ! h264parse ! avdec_h264 ! tee name=orig"));
    }

    #[test]
    fn test_input_kind_selector() {
        assert_eq!(
            InputKind::from_source("wifibroadcast"),
            InputKind::NetworkStream
        );
        assert_eq!(
            InputKind::from_source("/dev/video0"),
            InputKind::DeviceCapture
        );
    }

    #[test]
    fn test_goggle_branch_shape() {
        let spec = build(InputKind::DeviceCapture, 0, "");
        let launch = spec.launch_string();
        assert!(launch.contains(
            "orig. ! videoscale ! capsfilter name=caps ! tee name=split ! queue ! \
             compositor name=mixer background=black ! video/x-raw,width=1920,height=1080 ! \
             xvimagesink double-buffer=false sync=false name=goggles"
        ));
        assert!(launch.contains("split. ! queue ! mixer."));
    }

    #[test]
    fn test_no_viewports_yields_single_render_target() {
        let spec = build(InputKind::DeviceCapture, 0, "");
        assert_eq!(spec.render_targets(), vec![GOGGLES_TARGET]);
    }

    #[test]
    fn test_viewport_render_targets() {
        let spec = build(InputKind::DeviceCapture, 3, "");
        assert_eq!(
            spec.render_targets(),
            vec!["goggles", "viewport0", "viewport1", "viewport2"]
        );
        let launch = spec.launch_string();
        for index in 0..3 {
            assert!(launch.contains(&format!(
                "orig. ! queue ! xvimagesink sync=false name=viewport{index}"
            )));
        }
        // Source, goggle view, second compositor input, three mirrors.
        assert_eq!(spec.branches().len(), 6);
    }

    #[test]
    fn test_dump_branch_appended_verbatim() {
        let fragment = "orig. ! jpegenc ! avimux ! queue ! filesink location=capture.mov";
        let spec = build(InputKind::DeviceCapture, 0, fragment);
        assert!(spec.launch_string().ends_with(fragment));
        // The recording branch is not a render target.
        assert_eq!(spec.render_targets(), vec![GOGGLES_TARGET]);
    }

    #[test]
    fn test_negative_viewport_count_is_invalid() {
        let result = PipelineSpec::build(InputKind::DeviceCapture, "/dev/video1", 1920, 1080, -1, "");
        assert_eq!(result, Err(TopologyError::InvalidTopology(-1)));
    }
}
