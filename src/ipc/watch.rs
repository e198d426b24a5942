use anyhow::Result;
use log::{info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{path::Path, sync::mpsc::Sender};

use super::server::IpcMsg;

/// Watches the profiles directory and reports touched `.toml` files. Editors
/// often replace files instead of writing in place, so the directory is
/// watched rather than the file.
pub fn watch_profiles(dir: &Path, tx: Sender<IpcMsg>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(ev) => {
            if !matches!(ev.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for p in ev.paths {
                if p.extension().is_some_and(|e| e == "toml") {
                    let _ = tx.send(IpcMsg::ProfileChanged(p));
                }
            }
        }
        Err(e) => warn!("profile watch error: {e}"),
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!("watching {} for profile changes", dir.display());
    Ok(watcher)
}
