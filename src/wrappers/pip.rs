use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::subtask::{OutputFilter, RunOptions, Task};
use crate::wrapper::{Wrapper, forward_args};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;

const UPGRADE_NAGS: &str =
    r"^WARNING: You are using pip version|^You should consider upgrading|^\[notice\]";

/// pip (preferring pip3) without version nags or bytecode droppings.
pub struct Pip {
    pub args: Vec<String>,
}

impl FromArgs for Pip {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: forward_args(args),
        })
    }
}

impl Pip {
    fn build(&self, env: &mut Environment) -> Result<Command> {
        let mut pip = Command::first_of(&["pip3", "pip"], env, Missing::Stop)?;
        env.set_var("PIP_DISABLE_PIP_VERSION_CHECK", "1");
        env.set_var("PYTHONDONTWRITEBYTECODE", "1");
        pip.extend_args(self.args.iter().cloned());
        Ok(pip)
    }
}

impl Wrapper for Pip {
    fn name() -> &'static str {
        "pip"
    }

    fn about() -> &'static str {
        "pip package manager without upgrade nags."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let pip = self.build(env)?;
        let filter = OutputFilter::new().drop_matching(UPGRADE_NAGS)?;
        Ok(Task::new(pip.cmdline()).run(env, &RunOptions::filtered(filter))?)
    }
}
