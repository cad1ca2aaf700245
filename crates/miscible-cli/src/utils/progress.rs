use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use miscible::engine::progress::{Progress, ProgressCallback};
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders core progress events on a single stderr bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);

        Box::new(move |progress: Progress| {
            let Ok(pb) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name);
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    pb.finish_with_message("✓ Done");
                }
                Progress::TaskStart { total_steps } => {
                    pb.disable_steady_tick();
                    pb.reset();
                    pb.set_length(total_steps);
                    pb.set_position(0);
                    pb.set_style(bar_style());
                }
                Progress::TaskIncrement => pb.inc(1),
                Progress::TaskFinish => {
                    let total = pb.length().unwrap_or(0);
                    if pb.position() < total {
                        pb.set_position(total);
                    }
                    pb.finish();
                }
                Progress::Probe {
                    temperature,
                    stability,
                } => {
                    pb.set_message(format!("T = {temperature:.1} K: {stability}"));
                }
                Progress::Message(msg) => {
                    if pb.is_finished() {
                        pb.set_message(msg);
                    } else {
                        pb.println(format!("  {}", msg));
                    }
                }
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    match ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})") {
        Ok(style) => style
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("##-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}
