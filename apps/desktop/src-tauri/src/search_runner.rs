use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use d2r_utility_core::{GameLocator, OpenFileDialogRequest};
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::sync::mpsc;

pub const SEARCH_PROGRESS_EVENT: &str = "search_progress";
pub const OPEN_FILE_DIALOG_EVENT: &str = "open_file_dialog";
pub const SEARCH_FINISHED_EVENT: &str = "search_finished";

#[derive(Debug, Clone, Serialize)]
pub struct SearchFinished {
    pub filename: String,
    pub paths: Vec<String>,
    pub cancelled: bool,
}

#[derive(Debug)]
pub enum SearchMsg {
    Start { filename: String },
    Cancel,
}

/// Runs one install search at a time on the blocking pool. A new start
/// while a search is running is queued behind it.
pub struct SearchRunner {
    tx: mpsc::Sender<SearchMsg>,
    cancel: Arc<AtomicBool>,
}

impl SearchRunner {
    pub fn new(app: AppHandle) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<SearchMsg>(8);
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();
        let app_handle = app.clone();

        tauri::async_runtime::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let SearchMsg::Start { filename } = msg else {
                    continue;
                };
                cancel_flag.store(false, Ordering::Relaxed);

                let emitter = app_handle.clone();
                let flag = cancel_flag.clone();
                let wanted = filename.clone();
                let res = tauri::async_runtime::spawn_blocking(move || {
                    GameLocator::new().search(&wanted, &flag, |progress| {
                        let _ = emitter.emit(SEARCH_PROGRESS_EVENT, &progress);
                    })
                })
                .await;

                let found = match res {
                    Ok(found) => found,
                    Err(join_err) => {
                        log::error!("install search for {filename} failed: {join_err}");
                        Vec::new()
                    }
                };
                let cancelled = cancel_flag.load(Ordering::Relaxed);
                if found.is_empty() && !cancelled {
                    let _ = app_handle.emit(
                        OPEN_FILE_DIALOG_EVENT,
                        &OpenFileDialogRequest::not_found(&filename),
                    );
                }
                let _ = app_handle.emit(
                    SEARCH_FINISHED_EVENT,
                    &SearchFinished {
                        filename,
                        paths: found
                            .iter()
                            .map(|path| path.to_string_lossy().to_string())
                            .collect(),
                        cancelled,
                    },
                );
            }
        });

        Arc::new(Self { tx, cancel })
    }

    pub async fn start(&self, filename: String) -> Result<(), String> {
        self.tx
            .send(SearchMsg::Start { filename })
            .await
            .map_err(|e| e.to_string())
    }

    /// Takes effect immediately; the running walk checks the flag between
    /// directories.
    pub async fn cancel(&self) -> Result<(), String> {
        self.cancel.store(true, Ordering::Relaxed);
        self.tx
            .send(SearchMsg::Cancel)
            .await
            .map_err(|e| e.to_string())
    }
}
