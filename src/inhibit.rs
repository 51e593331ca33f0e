//! Screen-blanking suppression.
//!
//! Best effort only: ask the session screensaver service for a proper
//! inhibition, fall back to simulating user activity on a timer, and if
//! neither works just log and carry on with the stream.

use std::process::Command;
use std::thread;
use std::time::Duration;

const SCREENSAVER_DEST: &str = "org.gnome.ScreenSaver";
const SCREENSAVER_PATH: &str = "/org/gnome/ScreenSaver";
const ACTIVITY_INTERVAL: Duration = Duration::from_secs(10);

fn screensaver_call(method: &str, args: &[&str]) -> Result<(), String> {
    let method_name = format!("{SCREENSAVER_DEST}.{method}");
    let output = Command::new("gdbus")
        .args([
            "call",
            "--session",
            "--dest",
            SCREENSAVER_DEST,
            "--object-path",
            SCREENSAVER_PATH,
            "--method",
            method_name.as_str(),
        ])
        .args(args)
        .output()
        .map_err(|err| format!("gdbus not runnable: {err}"))?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(())
}

/// Try to keep the screen awake for the lifetime of the process. Failures
/// are logged and tolerated, never fatal.
pub fn inhibit_screensaver(app_name: &str, reason: &str) {
    // Works on older screensaver versions only.
    let inhibit_error = match screensaver_call("Inhibit", &[app_name, reason]) {
        Ok(()) => {
            log::info!("screensaver inhibited via {SCREENSAVER_DEST}");
            return;
        }
        Err(err) => err,
    };

    match screensaver_call("SimulateUserActivity", &[]) {
        Ok(()) => {
            log::info!("screensaver suppressed by simulating user activity");
            let _ = thread::spawn(|| loop {
                thread::sleep(ACTIVITY_INTERVAL);
                if let Err(err) = screensaver_call("SimulateUserActivity", &[]) {
                    log::warn!("simulate-user-activity failed: {err}");
                }
            });
        }
        Err(activity_error) => {
            log::warn!(
                "screensaver could not be disabled with either method: \
                 inhibit: {inhibit_error}; simulate-user-activity: {activity_error}"
            );
        }
    }
}
