//! Display output discovery and selection.
//!
//! The resolver picks one connected output for the goggle window, either by
//! explicit port name or by scanning for a matching resolution, and rotates
//! portrait outputs to landscape. The platform tool is hidden behind the
//! [`DisplaySource`] trait so the text-scanning contract can be exercised
//! with canned output in tests.

use std::process::Command;

use regex::Regex;
use thiserror::Error;

/// Geometry token as reported per output line: `WxH+X+Y`.
const GEOMETRY_PATTERN: &str = r"\b([0-9]+)x([0-9]+)\+([0-9]+)\+([0-9]+)\b";

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("no connected output matches {0}")]
    NoMatchingOutput(String),
    #[error("output {0} seems to be disconnected")]
    OutputDisconnected(String),
    #[error("no geometry found in output line: {0}")]
    MalformedGeometry(String),
    #[error("display query failed: {0}")]
    QueryFailed(#[from] std::io::Error),
    #[error("rotate command failed for output {0}")]
    RotateFailed(String),
}

/// The render window's final placement, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTarget {
    pub width: u32,
    pub height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub output_name: String,
}

/// Access to the platform display-configuration tool.
pub trait DisplaySource {
    /// Line-oriented dump of all outputs and their geometry.
    fn query(&mut self) -> Result<String, DisplayError>;
    /// Rotate the named output a quarter turn counter-clockwise.
    fn rotate_left(&mut self, output: &str) -> Result<(), DisplayError>;
}

/// Real implementation shelling out to `xrandr`.
pub struct Xrandr;

impl DisplaySource for Xrandr {
    fn query(&mut self) -> Result<String, DisplayError> {
        let output = Command::new("xrandr").arg("-q").output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn rotate_left(&mut self, output: &str) -> Result<(), DisplayError> {
        let status = Command::new("xrandr")
            .args(["--output", output, "--rotate", "left"])
            .status()?;
        if !status.success() {
            return Err(DisplayError::RotateFailed(output.to_string()));
        }
        Ok(())
    }
}

/// Select the output surface for the goggle window.
///
/// With a preferred port name, the first line starting with that name wins.
/// Otherwise the first line carrying a ` WxH+` geometry matching the fallback
/// resolution (or its transposed form) wins. A matched but disconnected
/// output is an error. Portrait outputs (height > width) are rotated left
/// once and reported with width/height swapped.
pub fn resolve(
    source: &mut dyn DisplaySource,
    preferred: Option<&str>,
    fallback_width: u32,
    fallback_height: u32,
) -> Result<DisplayTarget, DisplayError> {
    let listing = source.query()?;
    let landscape = format!(" {fallback_width}x{fallback_height}+");
    let portrait = format!(" {fallback_height}x{fallback_width}+");

    let line = listing
        .lines()
        .find(|line| match preferred {
            Some(name) => line.starts_with(name),
            None => line.contains(&landscape) || line.contains(&portrait),
        })
        .ok_or_else(|| match preferred {
            Some(name) => DisplayError::NoMatchingOutput(name.to_string()),
            None => DisplayError::NoMatchingOutput(format!(
                "{fallback_width}x{fallback_height} resolution"
            )),
        })?;

    let output_name = match preferred {
        Some(name) => name.to_string(),
        None => line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    if line.contains("disconnected") {
        return Err(DisplayError::OutputDisconnected(output_name));
    }

    let pattern = Regex::new(GEOMETRY_PATTERN).expect("geometry pattern is valid");
    let captures = pattern
        .captures(line)
        .ok_or_else(|| DisplayError::MalformedGeometry(line.to_string()))?;
    let number = |i: usize| captures[i].parse::<i64>().unwrap_or_default();
    let (mut width, mut height) = (number(1) as u32, number(2) as u32);
    let (origin_x, origin_y) = (number(3) as i32, number(4) as i32);

    log::info!("using {output_name} for output");

    if height > width {
        log::info!("{output_name} is in portrait orientation, rotating left");
        source.rotate_left(&output_name)?;
        std::mem::swap(&mut width, &mut height);
    }

    Ok(DisplayTarget {
        width,
        height,
        origin_x,
        origin_y,
        output_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned display source recording rotate calls.
    struct FakeDisplay {
        listing: String,
        rotations: Vec<String>,
    }

    impl FakeDisplay {
        fn new(listing: &str) -> Self {
            Self {
                listing: listing.to_string(),
                rotations: Vec::new(),
            }
        }
    }

    impl DisplaySource for FakeDisplay {
        fn query(&mut self) -> Result<String, DisplayError> {
            Ok(self.listing.clone())
        }

        fn rotate_left(&mut self, output: &str) -> Result<(), DisplayError> {
            self.rotations.push(output.to_string());
            Ok(())
        }
    }

    const LISTING: &str = "\
Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
eDP1 connected primary 1366x768+1920+0 (normal left inverted right) 310mm x 170mm
HDMI1 connected 1920x1080+0+0 (normal left inverted right) 530mm x 300mm
VGA1 disconnected (normal left inverted right)
";

    #[test]
    fn test_fallback_resolution_match() {
        let mut display = FakeDisplay::new(LISTING);
        let target = resolve(&mut display, None, 1920, 1080).unwrap();
        assert_eq!(
            target,
            DisplayTarget {
                width: 1920,
                height: 1080,
                origin_x: 0,
                origin_y: 0,
                output_name: "HDMI1".to_string(),
            }
        );
        assert!(display.rotations.is_empty());
    }

    #[test]
    fn test_preferred_port_match() {
        let mut display = FakeDisplay::new(LISTING);
        let target = resolve(&mut display, Some("eDP1"), 1920, 1080).unwrap();
        assert_eq!(target.output_name, "eDP1");
        assert_eq!((target.width, target.height), (1366, 768));
        assert_eq!((target.origin_x, target.origin_y), (1920, 0));
    }

    #[test]
    fn test_no_matching_output() {
        let mut display = FakeDisplay::new(LISTING);
        assert!(matches!(
            resolve(&mut display, None, 2560, 1440),
            Err(DisplayError::NoMatchingOutput(_))
        ));
        assert!(matches!(
            resolve(&mut display, Some("DP3"), 1920, 1080),
            Err(DisplayError::NoMatchingOutput(_))
        ));
    }

    #[test]
    fn test_disconnected_output() {
        let listing = "HDMI1 disconnected 1920x1080+0+0 (normal left inverted right)\n";
        let mut display = FakeDisplay::new(listing);
        assert!(matches!(
            resolve(&mut display, None, 1920, 1080),
            Err(DisplayError::OutputDisconnected(name)) if name == "HDMI1"
        ));
    }

    #[test]
    fn test_portrait_output_is_rotated_once() {
        let listing = "DP1 connected 1080x1920+0+0 (normal left inverted right)\n";
        let mut display = FakeDisplay::new(listing);
        let target = resolve(&mut display, None, 1920, 1080).unwrap();
        assert_eq!((target.width, target.height), (1920, 1080));
        assert_eq!(display.rotations, vec!["DP1".to_string()]);
    }

    #[test]
    fn test_first_match_wins_in_scan_order() {
        let listing = "\
DP1 connected 1920x1080+0+0 (normal left inverted right)
DP2 connected 1920x1080+1920+0 (normal left inverted right)
";
        let mut display = FakeDisplay::new(listing);
        let target = resolve(&mut display, None, 1920, 1080).unwrap();
        assert_eq!(target.output_name, "DP1");
    }

    #[test]
    fn test_line_without_geometry_is_malformed() {
        let listing = "HDMI1 connected primary (normal left inverted right)\n";
        let mut display = FakeDisplay::new(listing);
        assert!(matches!(
            resolve(&mut display, Some("HDMI1"), 1920, 1080),
            Err(DisplayError::MalformedGeometry(_))
        ));
    }
}
