// WHY: tokenizer and matcher report progress the same way, so the percentage rule lives here once

/// Tracks completion of a fixed number of steps and reports floor percentages
///
/// `start` always reports 0. `advance` reports `floor(100 * completed / total)` only when
/// that value is larger than the last reported one, so reports are strictly increasing
/// and the last step of a non-empty job reports 100.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_steps: usize,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            last_percent: 0,
        }
    }

    /// Report the initial 0%
    pub fn start<F: FnMut(u8)>(&mut self, on_progress: &mut F) {
        self.last_percent = 0;
        on_progress(0);
    }

    /// Record that `completed_steps` of the total are done
    pub fn advance<F: FnMut(u8)>(&mut self, completed_steps: usize, on_progress: &mut F) {
        if self.total_steps == 0 {
            return;
        }

        let percent = (100 * completed_steps.min(self.total_steps) / self.total_steps) as u8;
        if percent > self.last_percent {
            self.last_percent = percent;
            on_progress(percent);
        }
    }

    /// Last percentage reported
    pub fn percent(&self) -> u8 {
        self.last_percent
    }
}
