use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh`): resolved against `current_dir`.
/// - `./foo` on Unix or any relative path on other platforms: tried in `current_dir` first.
/// - Single path component (no separators): search each directory of `search_dirs`
///   and return the first executable match, skipping the running executable itself.
/// - Empty path: returns `None`.
pub fn find_command_path<I>(search_dirs: I, current_dir: &Path, path: &Path) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    if path.is_absolute() {
        return find_by_path(path.to_path_buf());
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir {
        if let Some(found) = find_by_path(current_dir.join(path)) {
            return Some(found);
        }
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => {
            let self_exe = current_exe();
            find_in_dirs(search_dirs, x.as_os_str(), self_exe.as_deref())
        }
        _ => find_by_path(current_dir.join(path)),
    }
}

/// Search `dirs` in order for an executable called `cmd`.
///
/// A candidate resolving to the same file as `skip` is ignored.
pub fn find_in_dirs<I>(dirs: I, cmd: &OsStr, skip: Option<&Path>) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    for dir in dirs {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidates(&dir.join(cmd)) {
            if is_executable(&candidate) && !same_file(&candidate, skip) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Directories searched after PATH on this platform.
pub fn extra_search_dirs() -> Vec<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin", "/usr/local/bin", "/usr/sbin", "/sbin"]
    } else if cfg!(unix) {
        &["/usr/local/bin", "/usr/sbin", "/sbin", "/snap/bin"]
    } else {
        &[]
    };
    dirs.iter().map(PathBuf::from).collect()
}

/// Canonical path of the running executable.
pub(crate) fn current_exe() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| fs::canonicalize(p).ok())
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(windows)]
fn candidates(path: &Path) -> Vec<PathBuf> {
    if path.extension().is_some() {
        return vec![path.to_path_buf()];
    }
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    exts.split(';')
        .filter(|e| !e.is_empty())
        .map(|e| {
            let mut name = path.as_os_str().to_owned();
            name.push(e.to_ascii_lowercase());
            PathBuf::from(name)
        })
        .collect()
}

#[cfg(not(windows))]
fn candidates(path: &Path) -> Vec<PathBuf> {
    vec![path.to_path_buf()]
}

fn same_file(candidate: &Path, skip: Option<&Path>) -> bool {
    match skip {
        Some(skip) => fs::canonicalize(candidate)
            .map(|c| c == skip)
            .unwrap_or(false),
        None => false,
    }
}

fn find_by_path(path: PathBuf) -> Option<PathBuf> {
    if is_executable(&path) { Some(path) } else { None }
}
