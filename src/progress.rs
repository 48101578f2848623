//! Progress reporting using indicatif.
//!
//! The scan pipeline reports through the [`ProgressCallback`] trait so a
//! long run over a large tree can show liveness without the engine knowing
//! anything about terminals. [`Progress`] is the terminal implementation.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Receives progress updates during a scan.
///
/// Invoked between files; implementations must be cheap and must not block.
pub trait ProgressCallback: Send + Sync {
    /// A phase ("enumerating", "refreshing", "comparing") started.
    /// `total` is 0 when the item count is not known up front.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// One item was processed.
    fn on_progress(&self, current: usize, total: usize, path: &str);

    /// The phase completed.
    fn on_phase_end(&self, phase: &str);
}

/// No-op callback for quiet runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}
    fn on_progress(&self, _current: usize, _total: usize, _path: &str) {}
    fn on_phase_end(&self, _phase: &str) {}
}

/// Terminal progress reporter.
pub struct Progress {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a reporter. With `quiet`, nothing is ever drawn.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if total == 0 {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(phase_label(phase).to_string());
        *self.bar.lock().unwrap() = Some(pb);
    }

    fn on_progress(&self, current: usize, _total: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(ref pb) = *self.bar.lock().unwrap() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_with_message(format!("{} complete", phase_label(phase)));
        }
    }
}

fn phase_label(phase: &str) -> &str {
    match phase {
        "enumerating" => "Enumerating audio files",
        "refreshing" => "Refreshing metadata cache",
        "comparing" => "Comparing candidates",
        other => other,
    }
}

/// Truncate a path for display, keeping the file name.
///
/// Counts chars, not bytes, so multi-byte file names never split mid-char.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if file_name.chars().count() >= max_len {
        let keep = max_len.saturating_sub(3);
        let mut tail: Vec<char> = file_name.chars().rev().take(keep).collect();
        tail.reverse();
        return format!("...{}", tail.into_iter().collect::<String>());
    }
    format!(".../{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_short_unchanged() {
        assert_eq!(truncate_path("/a/b.mp3", 40), "/a/b.mp3");
    }

    #[test]
    fn test_truncate_path_keeps_file_name() {
        let long = "/very/long/path/with/many/segments/track.mp3";
        assert_eq!(truncate_path(long, 20), ".../track.mp3");
    }

    #[test]
    fn test_truncate_path_long_file_name() {
        let long = format!("/p/{}.mp3", "x".repeat(60));
        let out = truncate_path(&long, 20);
        assert!(out.starts_with("..."));
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn test_truncate_path_multibyte_file_name() {
        let long = format!("/p/{}.mp3", "é".repeat(40));
        let out = truncate_path(&long, 20);
        assert!(out.starts_with("..."));
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with(".mp3"));
    }

    #[test]
    fn test_truncate_path_multibyte_short_path() {
        assert_eq!(truncate_path("/a/éè.mp3", 40), "/a/éè.mp3");
    }

    #[test]
    fn test_silent_progress_is_callable() {
        let p = SilentProgress;
        p.on_phase_start("refreshing", 10);
        p.on_progress(1, 10, "/a.mp3");
        p.on_phase_end("refreshing");
    }
}
