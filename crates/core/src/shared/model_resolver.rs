use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("model {name} not found in cache or bundled directory")]
    Missing { name: String },
    #[error("failed to install model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a cascade model file by name.
///
/// Resolution order:
/// 1. Explicit path from the host (returned as-is, even if missing, so the
///    loader reports the real I/O error)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory: the model is copied into the cache first, so later
///    runs no longer depend on the bundle location
pub fn resolve(
    name: &str,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    resolve_in(&model_cache_dir()?, name, bundled_dir)
}

/// Same as [`resolve`] without an explicit path, against a given cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    let bundled_path = bundled_dir
        .map(|dir| dir.join(name))
        .filter(|p| p.exists())
        .ok_or_else(|| ModelResolveError::Missing {
            name: name.to_string(),
        })?;

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    install(&bundled_path, &cached_path)?;
    log::info!(
        "Installed cascade model {} -> {}",
        bundled_path.display(),
        cached_path.display()
    );
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceWatch/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceWatch/models/` or `~/.cache/FaceWatch/models/`
/// - Windows: `%LOCALAPPDATA%/FaceWatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("FaceWatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("FaceWatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

/// Copies through a `.part` file so an interrupted install never leaves a
/// truncated model at the final path.
fn install(src: &Path, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = fs::copy(src, &temp_path)
        .and_then(|_| fs::rename(&temp_path, dest))
        .map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
