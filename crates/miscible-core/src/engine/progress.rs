use super::state::Stability;

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// A single stability evaluation during a temperature search.
    Probe { temperature: f64, stability: Stability },

    /// Notice worth surfacing outside the log, such as a failed screening job.
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::TaskIncrement);
    }

    #[test]
    fn reporter_forwards_events_to_callback() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Probe { temperature, .. } = event {
                seen.lock().unwrap().push(temperature);
            }
        }));
        reporter.report(Progress::Probe {
            temperature: 1200.0,
            stability: Stability::Stable,
        });
        reporter.report(Progress::TaskFinish);
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec![1200.0]);
    }
}
