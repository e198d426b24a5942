use anyhow::{Result, anyhow};
use directories::UserDirs;
use std::{fs, path::PathBuf};

pub fn runtime_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let dir = home.join(".local").join("run");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Control socket: one JSON request per connection.
pub fn socket_path() -> Result<PathBuf> {
    Ok(runtime_dir()?.join("pinchctl.sock"))
}

/// Landmark producer socket: NDJSON frames, one producer at a time.
pub fn frames_socket_path() -> Result<PathBuf> {
    Ok(runtime_dir()?.join("pinchctl.frames.sock"))
}
