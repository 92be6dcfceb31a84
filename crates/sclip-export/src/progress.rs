//! Stage progress reporting.

/// Caller-supplied progress sink.
///
/// Invoked fire-and-forget at each stage checkpoint; no return value is
/// consumed, so a slow or broken transport can never stall the export.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

/// Sink that discards all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let seen: Mutex<Vec<(u8, String)>> = Mutex::new(Vec::new());
        let sink = |percent: u8, message: &str| {
            seen.lock().unwrap().push((percent, message.to_string()));
        };

        sink.report(10, "Trimming");
        sink.report(100, "Done");

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 10);
        assert_eq!(seen[1].1, "Done");
    }
}
