use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Weight of the newest sample in the smoothed rate.
const RATE_SMOOTHING: f64 = 0.3;

/// Progress of one batch: completed items, elapsed time and a smoothed rate.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub label: String,
    pub completed: usize,
    pub total: usize,
    pub current_item: Option<String>,
    pub start_time: Instant,
    last_item_at: Instant,
    smoothed_rate: Option<f64>,
}

impl BatchProgress {
    pub fn new<S: Into<String>>(label: S, total: usize) -> Self {
        let now = Instant::now();
        Self {
            label: label.into(),
            completed: 0,
            total,
            current_item: None,
            start_time: now,
            last_item_at: now,
            smoothed_rate: None,
        }
    }

    /// Record a finished item, timing it from the previous one.
    pub fn finish_item<S: Into<String>>(&mut self, item: S) {
        let now = Instant::now();
        let took = now.duration_since(self.last_item_at);
        self.last_item_at = now;
        self.record(item, took);
    }

    /// Record a finished item that took `took`.
    pub fn record<S: Into<String>>(&mut self, item: S, took: Duration) {
        self.completed += 1;
        self.current_item = Some(item.into());

        // Sub-millisecond items would blow the rate up; clamp the sample.
        let sample = 1.0 / took.as_secs_f64().max(0.001);
        self.smoothed_rate = Some(match self.smoothed_rate {
            Some(rate) => RATE_SMOOTHING * sample + (1.0 - RATE_SMOOTHING) * rate,
            None => sample,
        });
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Items per second, exponentially smoothed.
    pub fn rate(&self) -> Option<f64> {
        self.smoothed_rate
    }

    pub fn estimated_remaining(&self) -> Duration {
        match self.smoothed_rate {
            Some(rate) if rate > 0.0 => Duration::from_secs_f64(self.remaining() as f64 / rate),
            _ => Duration::from_secs(0),
        }
    }
}

/// Receives batch progress. Observers only report; they never steer the batch.
pub trait ProgressObserver {
    fn batch_started(&mut self, progress: &BatchProgress);
    fn item_finished(&mut self, progress: &BatchProgress);
    fn batch_finished(&mut self, progress: &BatchProgress);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn batch_started(&mut self, _progress: &BatchProgress) {}
    fn item_finished(&mut self, _progress: &BatchProgress) {}
    fn batch_finished(&mut self, _progress: &BatchProgress) {}
}

/// Terminal progress bars.
pub struct ProgressManager {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    pub fn create_item_progress(&self, total_items: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total_items);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProgressObserver for ProgressManager {
    fn batch_started(&mut self, progress: &BatchProgress) {
        let bar = self.create_item_progress(progress.total as u64);
        bar.set_message(format!("{}...", progress.label));
        self.bar = Some(bar);
    }

    fn item_finished(&mut self, progress: &BatchProgress) {
        if let Some(ref bar) = self.bar {
            update_item_progress(bar, progress);
        }
    }

    fn batch_finished(&mut self, progress: &BatchProgress) {
        if let Some(bar) = self.bar.take() {
            finish_progress_with_summary(
                &bar,
                &format!("{}: {}/{} done", progress.label, progress.completed, progress.total),
                progress.elapsed(),
            );
        }
    }
}

pub fn update_item_progress(pb: &ProgressBar, progress: &BatchProgress) {
    pb.set_position(progress.completed as u64);

    let rate = progress
        .rate()
        .map(|r| format!(" {:.2} it/s", r))
        .unwrap_or_default();
    let eta = if progress.remaining() > 0 {
        let estimated_remaining = progress.estimated_remaining();
        if estimated_remaining.as_secs() > 0 {
            format!(" (ETA: {})", format_duration(estimated_remaining))
        } else {
            String::new()
        }
    } else {
        String::new()
    };

    match progress.current_item {
        Some(ref item) => pb.set_message(format!("{}{}{}", item, rate, eta)),
        None => pb.set_message(format!("{}...", progress.label)),
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_manager_creation() {
        let manager = ProgressManager::new(true);
        assert!(manager.is_enabled());

        let disabled_manager = ProgressManager::new(false);
        assert!(!disabled_manager.is_enabled());
        assert!(disabled_manager.create_item_progress(10).is_hidden());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "61m 1s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }

    #[test]
    fn test_smoothed_rate() {
        let mut progress = BatchProgress::new("Converting", 4);
        assert!(progress.rate().is_none());
        assert_eq!(progress.estimated_remaining(), Duration::from_secs(0));

        progress.record("A", Duration::from_secs(2));
        assert!((progress.rate().unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(progress.estimated_remaining(), Duration::from_secs(6));

        // 0.3 * 1.0 + 0.7 * 0.5
        progress.record("B", Duration::from_secs(1));
        assert!((progress.rate().unwrap() - 0.65).abs() < 1e-9);
        assert_eq!(progress.remaining(), 2);
        assert_eq!(progress.current_item.as_deref(), Some("B"));
        assert!((progress.percentage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        let progress = BatchProgress::new("Merging", 0);
        assert_eq!(progress.percentage(), 0.0);
        assert_eq!(progress.remaining(), 0);
    }

    #[test]
    fn test_hidden_observer_runs_full_batch() {
        let mut manager = ProgressManager::new(false);
        let mut progress = BatchProgress::new("Converting", 2);

        manager.batch_started(&progress);
        progress.finish_item("A");
        manager.item_finished(&progress);
        progress.finish_item("B");
        manager.item_finished(&progress);
        manager.batch_finished(&progress);

        assert_eq!(progress.completed, 2);
        assert!(manager.bar.is_none());
    }
}
