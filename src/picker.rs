//! Local file picking.
//!
//! [`await_pick`] resolves a presented picker into exactly one
//! [`PickOutcome`]. Two signals can end a pick early (a chosen file, or an
//! explicit "no file"); if neither arrives before the fallback timer the
//! pick counts as cancelled. Whichever comes first wins and the others are
//! dropped with the `select!`.
//!
//! Two pickers ship with the CLI:
//!
//! - [`PathPicker`] answers immediately with a file given up front.
//! - [`StdinPicker`] prompts for a path on stdin; an empty line means
//!   "no file", end of input means the picker closed without a word.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::models::file_extension;
use crate::traits::{FilePicker, PickSignal, PickedFile};

#[derive(Debug)]
pub enum PickOutcome {
    Chosen(PickedFile),
    /// The picker reported that nothing was selected.
    NoFile,
    /// Neither signal arrived before the fallback timer.
    TimedOut,
}

/// Present `picker` and wait for the first resolution.
pub async fn await_pick(
    picker: &dyn FilePicker,
    accept: &[String],
    cancel_after: Duration,
) -> PickOutcome {
    let (tx, rx) = oneshot::channel();
    picker.present(accept, tx);

    let signal = async {
        match rx.await {
            Ok(signal) => signal,
            // A picker that drops its handle said nothing; leave it to the timer.
            Err(_) => std::future::pending().await,
        }
    };

    tokio::select! {
        signal = signal => match signal {
            PickSignal::Chosen(file) => PickOutcome::Chosen(file),
            PickSignal::NoFile => PickOutcome::NoFile,
        },
        _ = tokio::time::sleep(cancel_after) => {
            tracing::debug!(after_ms = cancel_after.as_millis() as u64, "no picker signal, treating as cancelled");
            PickOutcome::TimedOut
        }
    }
}

/// Whether `file_name` matches one of the `.ext` entries in `accept`.
pub fn is_accepted(file_name: &str, accept: &[String]) -> bool {
    let Some(ext) = file_extension(file_name) else {
        return false;
    };
    accept
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

fn read_picked(path: &Path) -> std::io::Result<PickedFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Ok(PickedFile {
        name,
        bytes,
        source_url: Some(format!("file://{}", absolute.display())),
    })
}

fn signal_for(path: &Path) -> PickSignal {
    match read_picked(path) {
        Ok(file) => PickSignal::Chosen(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read picked file");
            PickSignal::NoFile
        }
    }
}

/// Picker that "chooses" a fixed path.
#[derive(Debug, Clone)]
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FilePicker for PathPicker {
    fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _ = reply.send(signal_for(&path));
        });
    }
}

/// Interactive picker reading a path from stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinPicker;

impl FilePicker for StdinPicker {
    fn present(&self, accept: &[String], reply: oneshot::Sender<PickSignal>) {
        eprint!("File to open ({}), empty to cancel: ", accept.join(","));
        // A plain thread: a read still blocked on stdin after the fallback
        // timer fires must not hold up runtime shutdown.
        std::thread::spawn(move || {
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                // End of input: the chooser went away without reporting anything.
                Ok(0) | Err(_) => {}
                Ok(_) => {
                    let trimmed = line.trim();
                    let signal = if trimmed.is_empty() {
                        PickSignal::NoFile
                    } else {
                        signal_for(Path::new(trimmed))
                    };
                    let _ = reply.send(signal);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_accept;

    struct SilentPicker;

    impl FilePicker for SilentPicker {
        fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
            drop(reply);
        }
    }

    struct NoFilePicker;

    impl FilePicker for NoFilePicker {
        fn present(&self, _accept: &[String], reply: oneshot::Sender<PickSignal>) {
            let _ = reply.send(PickSignal::NoFile);
        }
    }

    #[test]
    fn test_accept_list() {
        let accept = default_accept();
        assert!(is_accepted("q3.XLSX", &accept));
        assert!(is_accepted("data.csv", &accept));
        assert!(!is_accepted("notes.pdf", &accept));
        assert!(!is_accepted("Makefile", &accept));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_reply_waits_for_timer() {
        let start = tokio::time::Instant::now();
        let outcome = await_pick(&SilentPicker, &default_accept(), Duration::from_millis(5000)).await;
        assert!(matches!(outcome, PickOutcome::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_file_signal_is_fast() {
        let start = tokio::time::Instant::now();
        let outcome = await_pick(&NoFilePicker, &default_accept(), Duration::from_millis(5000)).await;
        assert!(matches!(outcome, PickOutcome::NoFile));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_path_picker_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("memo.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let outcome = await_pick(&PathPicker::new(&path), &default_accept(), Duration::from_secs(5)).await;
        match outcome {
            PickOutcome::Chosen(file) => {
                assert_eq!(file.name, "memo.docx");
                assert_eq!(file.bytes, b"PK\x03\x04");
                assert!(file.source_url.unwrap().starts_with("file://"));
            }
            other => panic!("expected a chosen file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_path_picker_missing_file_reports_no_file() {
        let outcome = await_pick(
            &PathPicker::new("/nonexistent/memo.docx"),
            &default_accept(),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(outcome, PickOutcome::NoFile));
    }
}
