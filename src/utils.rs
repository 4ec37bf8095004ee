use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};

static DEFAULT_DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("event-hunter")
});

/// Data root for the store and config; an explicit override wins.
pub fn data_root(override_dir: Option<&Path>) -> PathBuf {
    let root = override_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| DEFAULT_DATA_ROOT.clone());
    if let Err(err) = fs::create_dir_all(&root) {
        tracing::warn!(path = %root.display(), "failed to create data root: {err}");
    }
    root
}

pub fn database_path(root: &Path) -> PathBuf {
    root.join("event-hunter.sqlite")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), "failed to create parent: {err}");
        }
    }
}

/// Collapses runs of whitespace, as scraped and model-written text is messy.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
