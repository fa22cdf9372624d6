use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::sandbox::Sandbox;
use crate::subtask::{Background, RunOptions, Task};
use crate::wrapper::Wrapper;
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;
use tracing::info;

/// Paths every graphical program needs once `/tmp` and home are hidden.
const DISPLAY_ACCESS: [&str; 3] = ["/dev/dri", "/dev/snd", "/tmp/.X11-unix"];

#[derive(FromArgs)]
/// Launch a game with a restricted view of the filesystem and no network.
pub struct Game {
    #[argh(switch)]
    /// allow network access.
    pub net: bool,

    #[argh(option)]
    /// extra path the game may use (append ":ro" for read-only); repeatable.
    pub allow: Vec<String>,

    #[argh(switch)]
    /// return immediately instead of waiting for the game to exit.
    pub background: bool,

    #[argh(positional)]
    /// game executable, by name or path.
    pub program: String,

    #[argh(positional)]
    /// arguments for the game (put them after "--" when they start with "-").
    pub args: Vec<String>,
}

impl Game {
    fn build(&self, env: &Environment) -> Result<Sandbox> {
        let mut program = Command::new(&self.program, env, Missing::Stop)?;
        program.extend_args(self.args.iter().cloned());

        let mut grants: Vec<String> = DISPLAY_ACCESS.iter().map(|s| s.to_string()).collect();
        if let Some(runtime) = env.get_var("XDG_RUNTIME_DIR").filter(|d| !d.is_empty()) {
            grants.push(runtime);
        }
        if let Some(dir) = program
            .file()
            .and_then(|f| std::fs::canonicalize(f).ok())
            .and_then(|f| f.parent().map(|p| p.to_path_buf()))
        {
            grants.push(dir.to_string_lossy().into_owned());
        }
        grants.extend(self.allow.iter().cloned());
        if self.net {
            grants.push("net".to_string());
        }

        let mut sandbox = Sandbox::new(program, env)?;
        sandbox.sandbox(&grants)?;
        Ok(sandbox)
    }
}

impl Wrapper for Game {
    fn name() -> &'static str {
        "game"
    }

    fn about() -> &'static str {
        "Sandboxed game launcher (bubblewrap) with no network by default."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let sandbox = self.build(env)?;
        let cmdline = sandbox.cmdline();
        if self.background {
            let child = Background::new(cmdline).run(env)?;
            info!("{} started with pid {}", self.program, child.id());
            return Ok(0);
        }
        Ok(Task::new(cmdline).run(env, &RunOptions::default())?)
    }
}
