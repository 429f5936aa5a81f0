use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::{
    ServeArgs,
    build::{
        BuildResult, Builder, ChangeKind, FileWatcher, STATIC_DIR, WatchEvent, WatchPaths,
        base_path_from_config,
    },
    config::RootConfig,
};

/// Path of the server-sent events endpoint the live reload script listens on.
const LIVE_RELOAD_PATH: &str = "/_folio/live-reload";

/// SSE handler for live reload notifications.
async fn live_reload_handler(
    State(tx): State<broadcast::Sender<()>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = tx.subscribe();
    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(_) => {
                    yield Ok(Event::default().event("reload").data("reload"));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some messages, but that's fine - we just need the latest
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn router(output_dir: &Path, reload_tx: broadcast::Sender<()>) -> Router {
    let serve_dir = ServeDir::new(output_dir)
        .append_index_html_on_directories(true)
        .not_found_service(tower_http::services::ServeFile::new(output_dir.join("404.html")));

    Router::new()
        .route(LIVE_RELOAD_PATH, get(live_reload_handler))
        .with_state(reload_tx)
        .fallback_service(serve_dir)
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = RootConfig::load_from_arg(args.config_file.as_deref())
        .context("failed to load config")?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    // Create broadcast channel for live reload
    let (reload_tx, _) = broadcast::channel::<()>(16);

    info!("Building site...");
    let result = do_build(&config, &base_path).await.context("build failed")?;
    info!(
        "Built {} documents, {} pages, {} static files",
        result.documents, result.pages, result.static_files
    );

    let _watcher_handle = if args.watch {
        let watch_paths = watch_paths(&config, &base_path, &config_path);
        match FileWatcher::new(&config.dev.watch, watch_paths) {
            Ok(watcher) => {
                info!("Watching for changes...");
                let rebuild_config = config.clone();
                let rebuild_base = base_path.clone();
                let rebuild_config_path = config_path.clone();
                let watcher_reload_tx = reload_tx.clone();

                Some(tokio::task::spawn_blocking(move || {
                    rebuild_loop(
                        watcher,
                        rebuild_config,
                        &rebuild_base,
                        &rebuild_config_path,
                        &watcher_reload_tx,
                    )
                }))
            }
            Err(e) => {
                warn!("Failed to start file watcher: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = router(&result.output_dir, reload_tx);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    info!("Serving site at {}", url);
    info!("Press Ctrl+C to stop");

    // Open browser if requested
    if args.open
        && let Err(e) = open::that(&url)
    {
        warn!("Failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild on every batch of changes, one build at a time, and notify
/// connected browsers after each successful build.
fn rebuild_loop(
    watcher: FileWatcher,
    mut config: RootConfig,
    base_path: &Path,
    config_path: &Path,
    reload_tx: &broadcast::Sender<()>,
) {
    // Builds run on their own runtime, off the server's worker threads
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create rebuild runtime, watching disabled: {}", e);
            return;
        }
    };

    while let Some(event) = watcher.recv() {
        match event {
            WatchEvent::FilesChanged(changes) => {
                info!("Detected {} change(s), rebuilding...", changes.len());
                for change in &changes {
                    debug!(%change, "changed");
                }

                if changes.contains(&ChangeKind::Config) {
                    match RootConfig::load_from_file(config_path) {
                        Ok(reloaded) => {
                            info!("Reloaded {}", config_path.display());
                            config = reloaded;
                        }
                        Err(e) => {
                            error!("Config error, keeping the previous config: {}", e);
                            continue;
                        }
                    }
                }

                match rt.block_on(do_build(&config, base_path)) {
                    Ok(result) => {
                        info!(
                            "Rebuilt {} documents, {} pages, {} static files",
                            result.documents, result.pages, result.static_files
                        );
                        // Notify connected browsers to reload
                        let _ = reload_tx.send(());
                    }
                    Err(e) => error!("Build error: {:#}", e),
                }
            }
            WatchEvent::Error(e) => {
                warn!("Watch error: {}", e);
            }
        }
    }
}

/// Inputs of a build, canonicalized to match the paths in file events.
fn watch_paths(config: &RootConfig, base_path: &Path, config_path: &Path) -> WatchPaths {
    let canonical = |path: PathBuf| path.canonicalize().unwrap_or(path);
    WatchPaths {
        content_dir: canonical(base_path.join(&config.content.path)),
        theme_dir: config.theme.path.as_ref().map(|p| canonical(base_path.join(p))),
        static_dir: canonical(base_path.join(STATIC_DIR)),
        bibliography: config
            .markdown
            .bibliography
            .as_ref()
            .map(|p| canonical(base_path.join(p))),
        config_path: canonical(config_path.to_path_buf()),
    }
}

/// Helper function to run the build
async fn do_build(config: &RootConfig, base_path: &Path) -> Result<BuildResult, anyhow::Error> {
    let builder = Builder::new(config.clone(), base_path.to_path_buf())
        .with_dev_mode(true)
        .with_live_reload(config.dev.live_reload);
    Ok(builder.build().await?)
}
