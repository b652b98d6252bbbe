#[derive(Debug, Clone)]
pub enum Progress {
    StageStart { name: String, tasks: u64 },
    TaskDone,
    StageFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards workflow events to an optional observer, typically a progress bar.
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
    fn silent_reporter_ignores_events() {
        ProgressReporter::new().report(Progress::TaskDone);
    }

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let label = match event {
                Progress::StageStart { name, tasks } => format!("start {name} {tasks}"),
                Progress::TaskDone => "task".to_string(),
                Progress::StageFinish => "finish".to_string(),
                Progress::Message(m) => m,
            };
            seen.lock().unwrap().push(label);
        }));
        reporter.report(Progress::StageStart { name: "00.lj_on".into(), tasks: 2 });
        reporter.report(Progress::TaskDone);
        reporter.report(Progress::StageFinish);
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec!["start 00.lj_on 2", "task", "finish"]);
    }
}
