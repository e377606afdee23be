//! Terminal stand-in for the settings UI.

use std::io::{BufRead, Write};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use tsundoku_core::config::ColorTheme;
use tsundoku_runtime::{Confirmation, Decision, SettingsHost, SubFlow, ToastKind};

pub struct ConsoleHost {
    assume_yes: bool,
    launched: Mutex<Vec<SubFlow>>,
}

impl ConsoleHost {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Flows launched so far, oldest first.
    pub fn take_launched(&self) -> Vec<SubFlow> {
        std::mem::take(&mut *self.launched.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SettingsHost for ConsoleHost {
    fn toast(&self, message: &str, kind: ToastKind) {
        let tag = match kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        };
        println!("[{tag}] {message}");
    }

    fn apply_theme(&self, theme: ColorTheme) {
        println!("Theme applied: {}", resolve_theme(theme));
    }

    fn set_summary(&self, key: &str, summary: Option<&str>) {
        println!("{key}: {}", summary.unwrap_or("(not set)"));
    }

    fn launch(&self, flow: SubFlow) {
        let json = serde_json::to_string(&flow).unwrap_or_else(|_| format!("{flow:?}"));
        tracing::info!(flow = %json, "Launching");
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(flow);
    }

    fn confirm(&self, request: Confirmation) -> oneshot::Receiver<Decision> {
        let (tx, rx) = oneshot::channel();
        let message = request.message();
        if self.assume_yes {
            println!("{message} [y/N] y");
            let _ = tx.send(Decision::Confirmed);
            return rx;
        }
        tokio::task::spawn_blocking(move || {
            print!("{message} [y/N] ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            let decision = match std::io::stdin().lock().read_line(&mut line) {
                Ok(_) if matches!(line.trim(), "y" | "Y" | "yes") => Decision::Confirmed,
                _ => Decision::Cancelled,
            };
            let _ = tx.send(decision);
        });
        rx
    }
}

/// Resolve `ColorTheme::System` to a concrete light or dark theme.
pub fn resolve_theme(theme: ColorTheme) -> ColorTheme {
    match theme {
        ColorTheme::System => match dark_light::detect() {
            Ok(dark_light::Mode::Light) => ColorTheme::Light,
            _ => ColorTheme::Dark,
        },
        other => other,
    }
}
