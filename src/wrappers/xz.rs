use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::subtask::Exec;
use crate::wrapper::{Wrapper, forward_args};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;

/// xz with maximum compression and all CPU threads unless told otherwise.
pub struct Xz {
    pub args: Vec<String>,
}

impl FromArgs for Xz {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: forward_args(args),
        })
    }
}

impl Xz {
    fn build(&self, env: &Environment) -> Result<Command> {
        let mut xz = Command::new("xz", env, Missing::Stop)?;
        if !self.args.iter().any(|a| is_level(a)) {
            xz.extend_args(["-9", "-e"]);
        }
        if !self
            .args
            .iter()
            .any(|a| a.starts_with("--threads") || a.starts_with("-T"))
        {
            xz.append_arg("--threads=0");
        }
        xz.extend_args(self.args.iter().cloned());
        Ok(xz)
    }
}

/// `-0` .. `-9`, optionally combined with `e` (`-9e`).
fn is_level(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    let mut chars = rest.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_digit())
        && chars.all(|c| c == 'e')
}

impl Wrapper for Xz {
    fn name() -> &'static str {
        "xz"
    }

    fn about() -> &'static str {
        "xz compressor defaulting to -9 -e with all CPU threads."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let xz = self.build(env)?;
        Ok(Exec::new(xz.cmdline()).run(env)?)
    }
}
