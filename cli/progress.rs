use indicatif::{ProgressBar, ProgressStyle};
use repocat_core::{EntryStatus, FileEntry};
use std::time::Duration;

/// Spinner shown while cloning and walking. Hidden when disabled.
pub struct Spinner {
    bar: ProgressBar,
    emitted: u64,
}

impl Spinner {
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar, emitted: 0 }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn file_visited(&mut self, entry: &FileEntry) {
        if entry.status == EntryStatus::Included {
            self.emitted += 1;
        }
        self.bar.set_message(format!(
            "Collecting files ({} emitted): {}",
            self.emitted, entry.relative_path
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
