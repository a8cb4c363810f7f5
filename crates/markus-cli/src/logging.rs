// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

/// Routes `tracing` output to `path`; the terminal belongs to the UI.
pub fn init(path: &Path, level: Level) -> Result<()> {
    let file = open_log_file(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(level)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].path to a writable file",
                path.display()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::open_log_file;
    use anyhow::Result;
    use std::io::Write;

    #[test]
    fn open_log_file_creates_parents_and_appends() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("markus.log");

        writeln!(open_log_file(&path)?, "first")?;
        writeln!(open_log_file(&path)?, "second")?;

        assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }
}
