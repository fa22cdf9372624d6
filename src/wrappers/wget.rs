use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::subtask::Exec;
use crate::wrapper::{Wrapper, forward_args};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;

/// Defaults added unless the user passes the same option.
const DEFAULTS: [(&str, &str); 3] = [
    ("--timeout", "--timeout=30"),
    ("--tries", "--tries=3"),
    ("--continue", "--continue"),
];

/// wget with a network timeout, a few retries and resumable downloads.
pub struct Wget {
    pub args: Vec<String>,
}

impl FromArgs for Wget {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: forward_args(args),
        })
    }
}

impl Wget {
    fn build(&self, env: &Environment) -> Result<Command> {
        let mut wget = Command::new("wget", env, Missing::Stop)?;
        for (option, default) in DEFAULTS {
            if !self.args.iter().any(|a| a.starts_with(option)) {
                wget.append_arg(default);
            }
        }
        wget.extend_args(self.args.iter().cloned());
        Ok(wget)
    }
}

impl Wrapper for Wget {
    fn name() -> &'static str {
        "wget"
    }

    fn about() -> &'static str {
        "wget with timeout, retries and resumable downloads."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let wget = self.build(env)?;
        Ok(Exec::new(wget.cmdline()).run(env)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_defaults_unless_overridden() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("wget");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let mut env = Environment::empty("/");
        env.set_var("PATH", tmp.path().to_string_lossy());

        let wget = Wget {
            args: vec!["--tries=10".into(), "https://example.org/a.iso".into()],
        };
        let cmd = wget.build(&env).unwrap();
        assert_eq!(
            cmd.args(),
            ["--timeout=30", "--continue", "--tries=10", "https://example.org/a.iso"]
        );
    }
}
