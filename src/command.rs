use crate::config::Settings;
use crate::env::Environment;
use crate::error::{Result, WrapError};
use crate::external::{self, find_command_path, is_executable};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// What to do when a program cannot be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Return [`WrapError::NotFound`].
    Raise,
    /// Return [`WrapError::Stop`] with a user-facing message.
    Stop,
    /// Build an unresolved command; check [`Command::is_found`].
    Ignore,
}

/// An external program plus the arguments it will be started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    file: Option<PathBuf>,
    args: Vec<String>,
}

impl Command {
    /// Locate `name` in `WRAPKIT_PATH`, PATH and the platform extra directories.
    ///
    /// Names containing a path separator are resolved as paths instead.
    pub fn new(name: &str, env: &Environment, missing: Missing) -> Result<Self> {
        let file = locate(name, env);
        match file {
            Some(file) => {
                debug!("located {} at {}", name, file.display());
                Ok(Self {
                    name: name.to_string(),
                    file: Some(file),
                    args: Vec::new(),
                })
            }
            None => not_found(name, missing),
        }
    }

    /// First of `names` that can be located, e.g. `["vim", "vi"]`.
    pub fn first_of(names: &[&str], env: &Environment, missing: Missing) -> Result<Self> {
        for name in names {
            if let Ok(cmd) = Self::new(name, env, Missing::Raise) {
                return Ok(cmd);
            }
        }
        not_found(names.first().copied().unwrap_or_default(), missing)
    }

    /// Wrap an explicit executable file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !is_executable(&path) {
            return Err(WrapError::stop(format!(
                "Cannot find \"{}\" executable file.",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            file: Some(path),
            args: Vec::new(),
        })
    }

    pub fn is_found(&self) -> bool {
        self.file.is_some()
    }

    /// Name the command was looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved executable, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn set_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
    }

    pub fn extend_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    pub fn append_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Executable followed by arguments. Unresolved commands use their name.
    pub fn cmdline(&self) -> Vec<String> {
        let program = match &self.file {
            Some(file) => file.to_string_lossy().into_owned(),
            None => self.name.clone(),
        };
        std::iter::once(program)
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.cmdline().iter().map(|a| quote(a)).collect();
        write!(f, "{}", parts.join(" "))
    }
}

fn locate(name: &str, env: &Environment) -> Option<PathBuf> {
    let settings = Settings::from_env(env);
    let search_path = env.search_path();
    let mut dirs: Vec<PathBuf> = settings.extra_paths;
    dirs.extend(std::env::split_paths(&search_path));
    if settings.system_dirs {
        dirs.extend(external::extra_search_dirs());
    }
    find_command_path(dirs, &env.current_dir, Path::new(name))
}

fn not_found(name: &str, missing: Missing) -> Result<Command> {
    match missing {
        Missing::Raise => Err(WrapError::NotFound {
            program: name.to_string(),
        }),
        Missing::Stop => Err(WrapError::stop(format!(
            "Cannot find required \"{}\" software.",
            name
        ))),
        Missing::Ignore => Ok(Command {
            name: name.to_string(),
            file: None,
            args: Vec::new(),
        }),
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    #[cfg(unix)]
    fn make_tool(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn env_with_path(path: &str) -> Environment {
        let mut env = Environment::empty("/");
        env.set_var("PATH", path);
        env
    }

    #[test]
    #[cfg(unix)]
    fn test_resolves_from_path() {
        let cmd = Command::new("sh", &env_with_path("/bin:/usr/bin"), Missing::Raise).unwrap();
        assert!(cmd.is_found());
        assert!(cmd.file().unwrap().ends_with("sh"));
        assert_eq!(cmd.name(), "sh");
    }

    #[test]
    #[cfg(unix)]
    fn test_wrapkit_path_searched_first() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = make_tool(tmp.path(), "sh");
        let mut env = env_with_path("/bin:/usr/bin");
        env.set_var(crate::config::PATH_VAR, tmp.path().to_string_lossy());

        let cmd = Command::new("sh", &env, Missing::Raise).unwrap();
        assert_eq!(cmd.file(), Some(tool.as_path()));
    }

    #[test]
    fn test_missing_policies() {
        let env = env_with_path("");
        let name = "surely-not-installed-tool-4242";

        let raised = Command::new(name, &env, Missing::Raise).unwrap_err();
        assert!(matches!(raised, WrapError::NotFound { .. }));

        let stopped = Command::new(name, &env, Missing::Stop).unwrap_err();
        assert_eq!(
            stopped.to_string(),
            format!("Cannot find required \"{}\" software.", name)
        );

        let ignored = Command::new(name, &env, Missing::Ignore).unwrap();
        assert!(!ignored.is_found());
        assert_eq!(ignored.cmdline(), vec![name.to_string()]);
    }

    #[test]
    #[cfg(unix)]
    fn test_first_of_falls_through() {
        let tmp = tempfile::tempdir().unwrap();
        make_tool(tmp.path(), "vi");
        let env = env_with_path(&tmp.path().to_string_lossy());

        let cmd = Command::first_of(&["not-a-vim-4242", "vi"], &env, Missing::Stop).unwrap();
        assert_eq!(cmd.name(), "vi");

        let err = Command::first_of(&["nope-1", "nope-2"], &env, Missing::Stop).unwrap_err();
        assert!(err.to_string().contains("\"nope-1\""));
    }

    #[test]
    #[cfg(unix)]
    fn test_relative_path_resolved_against_env_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("bin")).unwrap();
        let tool = make_tool(&tmp.path().join("bin"), "run");
        let env = Environment::empty(tmp.path());

        let cmd = Command::new("bin/run", &env, Missing::Raise).unwrap();
        assert_eq!(cmd.file(), Some(tool.as_path()));
    }

    #[test]
    #[cfg(unix)]
    fn test_dot_prefix_uses_env_dir_not_process_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        make_tool(tmp.path(), "run");
        let mut env = Environment::empty(tmp.path());
        env.set_var(crate::config::SYSTEM_DIRS_VAR, "0");

        let cmd = Command::new("./run", &env, Missing::Raise).unwrap();
        assert_eq!(cmd.file(), Some(tmp.path().join("run").as_path()));

        let plain = Command::new("run", &env, Missing::Ignore).unwrap();
        assert!(!plain.is_found());
    }

    #[test]
    #[cfg(unix)]
    fn test_args_and_cmdline() {
        let mut cmd = Command::from_file("/bin/sh").unwrap();
        cmd.set_args(["-c", "true"]);
        cmd.append_arg("extra arg");
        cmd.extend_args(vec!["x".to_string()]);
        assert!(cmd.has_arg("-c"));
        assert!(!cmd.has_arg("-x"));
        assert_eq!(cmd.cmdline(), vec!["/bin/sh", "-c", "true", "extra arg", "x"]);
        assert_eq!(cmd.to_string(), "/bin/sh -c true 'extra arg' x");
    }

    #[test]
    fn test_from_file_rejects_missing() {
        let err = Command::from_file("/no/such/file/4242").unwrap_err();
        assert!(matches!(err, WrapError::Stop(_)));
    }
}
