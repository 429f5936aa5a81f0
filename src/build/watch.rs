//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the content directory, theme
//! templates, static files, the bibliography and the config file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use super::paths::is_content_file;
use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// What kind of input changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A content file was created, modified or deleted.
    Content { path: PathBuf, deleted: bool },
    /// A theme template changed.
    Template { path: PathBuf },
    /// A file under the static directory changed.
    Static { path: PathBuf },
    /// The bibliography file changed.
    Bibliography,
    /// The config file changed.
    Config,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Content { path, deleted: true } => write!(f, "deleted {}", path.display()),
            ChangeKind::Content { path, .. } => write!(f, "content {}", path.display()),
            ChangeKind::Template { path } => write!(f, "template {}", path.display()),
            ChangeKind::Static { path } => write!(f, "static {}", path.display()),
            ChangeKind::Bibliography => f.write_str("bibliography"),
            ChangeKind::Config => f.write_str("config"),
        }
    }
}

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    /// Content root holding the collection directories.
    pub content_dir: PathBuf,
    /// Theme directory (for template changes), if a theme is configured.
    pub theme_dir: Option<PathBuf>,
    /// Static files copied into the output.
    pub static_dir: PathBuf,
    pub bibliography: Option<PathBuf>,
    pub config_path: PathBuf,
}

/// Classifies file paths into change types.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    paths: WatchPaths,
}

impl PathClassifier {
    pub fn new(paths: WatchPaths) -> Self {
        Self { paths }
    }

    /// Classify a changed path into a ChangeKind.
    pub fn classify(&self, path: &Path, deleted: bool) -> Option<ChangeKind> {
        let paths = &self.paths;

        // Skip hidden files, including our own temp files
        if path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'))
        {
            return None;
        }

        if path == paths.config_path {
            return Some(ChangeKind::Config);
        }

        if paths.bibliography.as_deref() == Some(path) {
            return Some(ChangeKind::Bibliography);
        }

        if let Some(theme_dir) = &paths.theme_dir
            && path.starts_with(theme_dir)
        {
            // Other theme files (CSS, etc.) are not part of the build
            return path
                .extension()
                .is_some_and(|e| e == "html")
                .then(|| ChangeKind::Template {
                    path: path.to_path_buf(),
                });
        }

        if path.starts_with(&paths.static_dir) {
            return Some(ChangeKind::Static {
                path: path.to_path_buf(),
            });
        }

        if path.starts_with(&paths.content_dir) && is_content_file(path) {
            return Some(ChangeKind::Content {
                path: path.to_path_buf(),
                deleted,
            });
        }

        None
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(config: &WatchConfig, paths: WatchPaths) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);
        let (tx, rx) = mpsc::channel();

        let classifier = PathClassifier::new(paths.clone());
        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let mut changes: Vec<ChangeKind> = events
                    .iter()
                    .filter(|event| is_relevant_event(&event.kind))
                    .filter_map(|event| {
                        let deleted = matches!(event.kind, EventKind::Remove(_));
                        event
                            .paths
                            .first()
                            .and_then(|p| classifier.classify(p, deleted))
                    })
                    .collect();
                changes.dedup();

                if !changes.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changes));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )?;
            add_watch_paths_to_debouncer(&mut debouncer, &paths)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            let mut debouncer = new_debouncer(debounce_timeout, None, callback)?;
            add_watch_paths_to_debouncer(&mut debouncer, &paths)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

/// Add watch paths to a debouncer.
fn add_watch_paths_to_debouncer<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    paths: &WatchPaths,
) -> Result<(), WatchError> {
    let recursive = [Some(&paths.content_dir), paths.theme_dir.as_ref(), Some(&paths.static_dir)];
    for dir in recursive.into_iter().flatten() {
        if dir.exists() {
            debouncer.watch(dir, RecursiveMode::Recursive)?;
        }
    }

    // Watch parent directories non-recursively so that editors replacing
    // the file are still seen
    let files = [Some(&paths.config_path), paths.bibliography.as_ref()];
    for file in files.into_iter().flatten() {
        if let Some(parent) = file.parent()
            && parent.exists()
            && !parent.starts_with(&paths.content_dir)
        {
            debouncer.watch(parent, RecursiveMode::NonRecursive)?;
        }
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}
