use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Mutable view of the process environment handed to wrappers.
///
/// Children are spawned with exactly these variables and this working
/// directory, so a wrapper can add, override or drop variables before
/// launching the wrapped program.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables visible to launched programs (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// Working directory for launched programs.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// An environment with no variables at all.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Drop a variable so launched programs do not inherit it.
    pub fn remove_var(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    /// Value of `PATH`, empty when unset.
    pub fn search_path(&self) -> String {
        self.get_var("PATH").unwrap_or_default()
    }

    /// Put `dir` in front of a PATH-style variable, moving it if present.
    pub fn prepend_path(&mut self, key: &str, dir: impl AsRef<Path>) {
        let dir = dir.as_ref().to_path_buf();
        let mut dirs: Vec<PathBuf> = self.split_var(key).filter(|d| d != &dir).collect();
        dirs.insert(0, dir);
        self.join_var(key, dirs);
    }

    /// Add `dir` at the end of a PATH-style variable unless already listed.
    pub fn append_path(&mut self, key: &str, dir: impl AsRef<Path>) {
        let dir = dir.as_ref().to_path_buf();
        let mut dirs: Vec<PathBuf> = self.split_var(key).collect();
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
        self.join_var(key, dirs);
    }

    /// Home directory from `HOME`, falling back to the platform lookup.
    pub fn home(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }

    /// Configure `cmd` to run with exactly this environment.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env_clear()
            .envs(self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.current_dir);
    }

    fn split_var(&self, key: &str) -> impl Iterator<Item = PathBuf> {
        let value = self.get_var(key).unwrap_or_default();
        stdenv::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn join_var(&mut self, key: &str, dirs: Vec<PathBuf>) {
        if let Ok(joined) = stdenv::join_paths(dirs) {
            self.set_var(key, joined.to_string_lossy());
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::env as stdenv;
    use std::path::PathBuf;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::empty(stdenv::current_dir().unwrap());

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));

        assert_eq!(env.remove_var("KEY"), Some("VALUE".to_string()));
        assert_eq!(env.get_var("KEY"), None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_prepend_path_moves_existing_entry() {
        let mut env = Environment::empty("/");
        env.set_var("PATH", "/usr/bin:/opt/tool/bin:/bin");
        env.prepend_path("PATH", "/opt/tool/bin");
        assert_eq!(env.search_path(), "/opt/tool/bin:/usr/bin:/bin");
    }

    #[test]
    #[cfg(unix)]
    fn test_append_path_skips_duplicates() {
        let mut env = Environment::empty("/");
        env.append_path("PATH", "/usr/bin");
        env.append_path("PATH", "/bin");
        env.append_path("PATH", "/usr/bin");
        assert_eq!(env.search_path(), "/usr/bin:/bin");
    }

    #[test]
    fn test_home_prefers_variable() {
        let mut env = Environment::empty("/");
        env.set_var("HOME", "/home/someone");
        assert_eq!(env.home(), Some(PathBuf::from("/home/someone")));
    }

    #[test]
    #[cfg(unix)]
    fn test_apply_replaces_child_environment() {
        let mut env = Environment::empty("/");
        env.set_var("ONLY_THIS", "1");
        let mut cmd = std::process::Command::new("/usr/bin/env");
        env.apply(&mut cmd);
        let vars: Vec<_> = cmd.get_envs().collect();
        assert_eq!(vars.len(), 1);
        assert_eq!(cmd.get_current_dir(), Some(std::path::Path::new("/")));
    }
}
