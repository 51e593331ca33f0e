//! Render-target registry.
//!
//! The graph's video sinks and the on-screen windows are created together,
//! keyed by the same names. The registry is populated once at window-creation
//! time and consulted, never mutated, when the engine asks for a window
//! handle. A lookup miss means the graph and the window set disagree, which
//! is a contract violation and fatal.

use std::collections::BTreeMap;

use thiserror::Error;
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

#[derive(Error, Debug, PartialEq)]
pub enum BindError {
    #[error("no drawing surface registered for render target {0}")]
    UnknownRenderTarget(String),
    #[error("window for render target {0} has no X11 handle")]
    UnsupportedHandle(String),
}

/// Immutable map from render-target name to native window id.
#[derive(Debug, Default)]
pub struct RenderTargetRegistry {
    targets: BTreeMap<String, u64>,
}

impl RenderTargetRegistry {
    /// Build the registry from the created windows. Fails if any window's
    /// native handle is not an X11 one.
    pub fn from_windows<'a, I>(windows: I) -> Result<Self, BindError>
    where
        I: IntoIterator<Item = (&'a str, &'a Window)>,
    {
        let mut targets = BTreeMap::new();
        for (name, window) in windows {
            targets.insert(name.to_string(), x11_window_id(name, window)?);
        }
        Ok(Self { targets })
    }

    /// Native window id for a named render target.
    pub fn window_id(&self, name: &str) -> Result<u64, BindError> {
        self.targets
            .get(name)
            .copied()
            .ok_or_else(|| BindError::UnknownRenderTarget(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn x11_window_id(name: &str, window: &Window) -> Result<u64, BindError> {
    let handle = window
        .window_handle()
        .map_err(|_| BindError::UnsupportedHandle(name.to_string()))?;
    match handle.as_raw() {
        RawWindowHandle::Xlib(xlib) => Ok(xlib.window as u64),
        _ => Err(BindError::UnsupportedHandle(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RenderTargetRegistry {
        let mut targets = BTreeMap::new();
        targets.insert("goggles".to_string(), 0x400001);
        targets.insert("viewport0".to_string(), 0x400002);
        RenderTargetRegistry { targets }
    }

    #[test]
    fn test_lookup_known_target() {
        assert_eq!(registry().window_id("goggles"), Ok(0x400001));
        assert_eq!(registry().window_id("viewport0"), Ok(0x400002));
    }

    #[test]
    fn test_lookup_unknown_target() {
        assert_eq!(
            registry().window_id("viewport1"),
            Err(BindError::UnknownRenderTarget("viewport1".to_string()))
        );
    }

    #[test]
    fn test_names_match_registered_set() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["goggles", "viewport0"]
        );
    }
}
