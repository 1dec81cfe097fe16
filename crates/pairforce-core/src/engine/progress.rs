#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    FramesStart { total: u64 },
    FrameDone { index: usize, total_energy: f64 },
    FramesFinish,

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
        reporter.report(Progress::FramesStart { total: 3 });
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(event);
        }));
        reporter.report(Progress::FramesStart { total: 1 });
        reporter.report(Progress::FrameDone {
            index: 0,
            total_energy: 0.5,
        });
        reporter.report(Progress::FramesFinish);
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                Progress::FramesStart { total: 1 },
                Progress::FrameDone {
                    index: 0,
                    total_energy: 0.5
                },
                Progress::FramesFinish,
            ]
        );
    }
}
