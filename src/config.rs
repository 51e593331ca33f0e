//! Command-line configuration.
//!
//! The option surface is deliberately small: an optional input source path,
//! an initial compositor scale, a repeatable viewport flag, and overrides for
//! the display output port and the recording branch. Parsing is a hand-rolled
//! scan so the error cases (missing value, duplicate source) stay explicit.

use thiserror::Error;

/// Input source used when no positional argument is given.
pub const DEFAULT_INPUT_PATH: &str = "/dev/video1";

/// Resolution the display resolver matches against when no output port is
/// named explicitly.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 1920;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 1080;

/// Initial compositor scale percent.
pub const DEFAULT_SCALE_PERCENT: i32 = 100;

/// Errors raised while parsing the command line. All of these are fatal and
/// reported before anything else starts.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("value for {flag} is not an integer: {value}")]
    InvalidInteger { flag: &'static str, value: String },
    #[error("input source already set to {0}")]
    DuplicateInput(String),
}

/// Fully parsed runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Capture device path, or the literal `wifibroadcast` for a network
    /// elementary stream on the pre-opened descriptor.
    pub input_path: String,
    /// Initial scale percent for the stereo compositor.
    pub default_scale: i32,
    /// Number of auxiliary mirror windows.
    pub viewports: i32,
    /// Verbatim recording-branch launch fragment, empty for none.
    pub dump_branch: String,
    /// Preferred display output port; `None` matches by resolution instead.
    pub output_port: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            input_path: DEFAULT_INPUT_PATH.to_string(),
            default_scale: DEFAULT_SCALE_PERCENT,
            viewports: 0,
            dump_branch: String::new(),
            output_port: None,
        }
    }
}

impl StreamConfig {
    /// Parse arguments (without the program name).
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut input_path = None::<String>;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-defscale" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("-defscale"))?;
                    config.default_scale =
                        value
                            .parse::<i32>()
                            .map_err(|_| ConfigError::InvalidInteger {
                                flag: "-defscale",
                                value,
                            })?;
                }
                "-viewport" => {
                    config.viewports += 1;
                }
                "-output" => {
                    let port = args.next().ok_or(ConfigError::MissingValue("-output"))?;
                    config.output_port = Some(port);
                }
                "-dump" => {
                    config.dump_branch = args.next().ok_or(ConfigError::MissingValue("-dump"))?;
                }
                _ => {
                    if let Some(existing) = input_path {
                        return Err(ConfigError::DuplicateInput(existing));
                    }
                    input_path = Some(arg);
                }
            }
        }

        if let Some(path) = input_path {
            config.input_path = path;
        }
        Ok(config)
    }
}
