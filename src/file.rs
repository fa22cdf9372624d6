//! Small filesystem helpers shared by wrappers.

use crate::env::Environment;
use crate::error::{Result, WrapError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::SystemTime;
use tracing::debug;

/// Per-user scratch directory `<tmp>/<prefix>-<user>`, created with mode
/// 0700 on unix.
///
/// `<tmp>` is `TMPDIR` from `env`, falling back to the platform temp dir.
pub fn tmpdir(env: &Environment, prefix: &str) -> Result<PathBuf> {
    let user = env
        .get_var("USER")
        .or_else(|| env.get_var("USERNAME"))
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let base = env
        .get_var("TMPDIR")
        .filter(|t| !t.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let dir = base.join(format!("{}-{}", prefix, user));
    fs::create_dir_all(&dir).map_err(|e| WrapError::io(&dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| WrapError::io(&dir, e))?;
    }

    Ok(dir)
}

/// The path with the most recent modification time.
pub fn newest<P: AsRef<Path>>(paths: &[P]) -> Option<PathBuf> {
    with_mtimes(paths)
        .max_by_key(|(mtime, _)| *mtime)
        .map(|(_, path)| path)
}

/// The path with the oldest modification time.
pub fn oldest<P: AsRef<Path>>(paths: &[P]) -> Option<PathBuf> {
    with_mtimes(paths)
        .min_by_key(|(mtime, _)| *mtime)
        .map(|(_, path)| path)
}

fn with_mtimes<P: AsRef<Path>>(paths: &[P]) -> impl Iterator<Item = (SystemTime, PathBuf)> + '_ {
    paths.iter().filter_map(|p| {
        let path = p.as_ref();
        let mtime = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some((mtime, path.to_path_buf()))
    })
}

/// Replace `path` with `bytes` via a sibling temp file and a rename.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WrapError::io(parent, e))?;
    }

    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", process::id()));
    let temp_path = path.with_file_name(name);

    let written = File::create(&temp_path).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(WrapError::io(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        WrapError::io(path, e)
    })?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
