//! Progress reporting for long-running steps.
//!
//! There is no cancellation; a progress sink only tells the user which
//! step the session is currently blocked on.

/// A sink for step-by-step progress messages.
pub trait Progress {
    fn inc(&mut self, message: &str);

    fn close(&mut self) {}
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn inc(&mut self, _message: &str) {}
}

/// Logs every step at info level.
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
    step: usize,
}

impl LogProgress {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            step: 0,
        }
    }

    pub fn steps(&self) -> usize {
        self.step
    }
}

impl Progress for LogProgress {
    fn inc(&mut self, message: &str) {
        self.step += 1;
        log::info!("[Geomap] {} ({}): {}", self.label, self.step, message);
    }

    fn close(&mut self) {
        log::debug!("[Geomap] {}: done after {} steps", self.label, self.step);
    }
}

/// Collects messages, for tests and for front ends that render a step list.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub messages: Vec<String>,
    pub closed: bool,
}

impl Progress for RecordingProgress {
    fn inc(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
