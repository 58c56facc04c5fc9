//! Picks up raw text changes made to the file outside the session.
//!
//! Events come from `notify` on the file's parent directory, since many
//! editors save by writing a temporary file and renaming it over the target.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Holds a change back until no further events arrive for `quiet`.
#[derive(Debug, Clone, Copy)]
struct Debounce {
    quiet: Duration,
    last_event: Option<Instant>,
}

impl Debounce {
    const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_event: None,
        }
    }

    fn record(&mut self, at: Instant) {
        self.last_event = Some(at);
    }

    /// True once, when the quiet period after the last event has passed.
    fn settled(&mut self, now: Instant) -> bool {
        match self.last_event {
            Some(at) if now.saturating_duration_since(at) >= self.quiet => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches one Markdown file and reports its new text after external edits.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    file: PathBuf,
    file_name: Option<OsString>,
    debounce: Debounce,
    /// Contents as of the last report, to skip saves that changed nothing.
    last_text: Option<String>,
}

impl FileWatcher {
    /// Start watching `path`.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created or the
    /// parent directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        let path = path.as_ref();
        // Event paths arrive absolute and canonical.
        let file = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let file_name = file.file_name().map(std::ffi::OsStr::to_os_string);
        let dir = parent_dir(&file);

        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(file = %file.display(), dir = %dir.display(), "watcher: started");

        Ok(Self {
            _watcher: watcher,
            events,
            dir,
            file,
            file_name,
            debounce: Debounce::new(debounce),
            last_text: std::fs::read_to_string(path).ok(),
        })
    }

    /// The canonical path of the watched file.
    pub fn target_path(&self) -> &Path {
        &self.file
    }

    /// The file's new text once a debounced change is ready and the
    /// contents differ from the last report.
    ///
    /// # Errors
    /// Returns an error if the changed file cannot be read.
    pub fn poll_text(&mut self) -> io::Result<Option<String>> {
        let now = Instant::now();
        let mut events = 0usize;
        while let Ok(event) = self.events.try_recv() {
            events += 1;
            match event {
                Ok(event) if self.concerns_file(&event) => self.debounce.record(now),
                Ok(event) => {
                    tracing::trace!(
                        kind = ?event.kind,
                        paths = ?event.paths,
                        "watcher: unrelated event"
                    );
                }
                Err(err) => tracing::warn!(%err, "watcher: error"),
            }
        }
        if events > 0 {
            tracing::trace!(events, file = %self.file.display(), "watcher: drained");
        }

        if !self.debounce.settled(now) {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.file)?;
        if self.last_text.as_deref() == Some(text.as_str()) {
            tracing::debug!("watcher: save left the text unchanged");
            return Ok(None);
        }
        self.last_text = Some(text.clone());
        Ok(Some(text))
    }

    fn concerns_file(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.dir
                || path == &self.file
                || self
                    .file_name
                    .as_ref()
                    .is_some_and(|name| path.file_name() == Some(name.as_os_str()))
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
