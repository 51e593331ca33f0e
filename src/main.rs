//! stereostream - Stereo goggle streamer entry point.

use anyhow::Context;
use winit::event_loop::{ControlFlow, EventLoop};

use stereostream::config::{
    StreamConfig, DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH,
};
use stereostream::display::{self, Xrandr};
use stereostream::graph::GraphEvent;
use stereostream::pipeline::{InputKind, PipelineSpec};
use stereostream::StereoApp;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match StreamConfig::parse(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    log::info!(
        "starting {} v{}: input={} scale={} viewports={}",
        stereostream::app::APP_NAME,
        env!("CARGO_PKG_VERSION"),
        config.input_path,
        config.default_scale,
        config.viewports
    );

    // Runs once, before the event loop; the only blocking external call.
    let target = match display::resolve(
        &mut Xrandr,
        config.output_port.as_deref(),
        DEFAULT_DISPLAY_WIDTH,
        DEFAULT_DISPLAY_HEIGHT,
    ) {
        Ok(target) => target,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(-1);
        }
    };

    gstreamer::init().context("failed to initialize media engine")?;

    let spec = PipelineSpec::build(
        InputKind::from_source(&config.input_path),
        &config.input_path,
        target.width,
        target.height,
        config.viewports,
        &config.dump_branch,
    )
    .context("failed to build pipeline topology")?;

    let event_loop = EventLoop::<GraphEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let proxy = event_loop.create_proxy();

    let mut app = StereoApp::new(config, target, spec, proxy);
    event_loop.run_app(&mut app).context("event loop failed")?;
    Ok(())
}
