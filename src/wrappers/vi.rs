use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::subtask::Exec;
use crate::wrapper::{Wrapper, forward_args};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::io::Write;
use std::sync::OnceLock;

/// Editor wrapper: prefers vim, understands `file:line` (as printed by
/// compilers and grep) and repairs a missing terminal type.
pub struct Vi {
    pub args: Vec<String>,
}

impl FromArgs for Vi {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: forward_args(args),
        })
    }
}

fn file_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?):(\d+):?$").expect("valid regex"))
}

impl Vi {
    fn build(&self, env: &Environment) -> Result<Command> {
        let mut vi = Command::first_of(&["vim", "vi"], env, Missing::Stop)?;
        for arg in &self.args {
            let existing = env.current_dir.join(arg).exists();
            match file_line().captures(arg) {
                Some(caps) if !arg.starts_with('-') && !existing => {
                    vi.append_arg(format!("+{}", &caps[2]));
                    vi.append_arg(&caps[1]);
                }
                _ => vi.append_arg(arg.as_str()),
            }
        }
        Ok(vi)
    }
}

fn fix_terminal(env: &mut Environment) {
    let term = env.get_var("TERM").unwrap_or_default();
    if term.is_empty() || term == "dumb" {
        env.set_var("TERM", "xterm-256color");
    }
}

impl Wrapper for Vi {
    fn name() -> &'static str {
        "vi"
    }

    fn about() -> &'static str {
        "Text editor (vim or vi) accepting file:line arguments."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        fix_terminal(env);
        let vi = self.build(env)?;
        Ok(Exec::new(vi.cmdline()).run(env)?)
    }
}
