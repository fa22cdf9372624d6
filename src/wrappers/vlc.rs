use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::file;
use crate::subtask::{Daemon, OutputFilter, RunOptions, Task};
use crate::wrapper::{Wrapper, forward_args, take_switch};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Lines VLC and its toolkits print on every start.
const NOISE: &str = concat!(
    r"^$",
    r"|^\[[0-9a-f]+\] .*(main|dbus|qt) .*(error|warning)",
    r"|Gtk-WARNING|Fontconfig (error|warning)",
    r"|^QSocketNotifier|^libva info",
);

/// Written on first run so VLC starts without its privacy and update prompts.
const DEFAULT_VLCRC: &str = "\
[qt]
qt-privacy-ask=0
qt-updates-notif=0

[core]
metadata-network-access=0
video-title-show=0
";

/// VLC media player with its start-up noise filtered. `--daemon` detaches it.
pub struct Vlc {
    pub daemon: bool,
    pub args: Vec<String>,
}

impl FromArgs for Vlc {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let mut args = forward_args(args);
        let daemon = take_switch(&mut args, "--daemon");
        Ok(Self { daemon, args })
    }
}

impl Vlc {
    fn build(&self, env: &Environment) -> Result<Command> {
        let mut vlc = Command::new("vlc", env, Missing::Stop)?;
        if !self.args.iter().any(|a| a.starts_with("--video-title")) {
            vlc.append_arg("--no-video-title-show");
        }
        vlc.extend_args(self.args.iter().cloned());
        Ok(vlc)
    }
}

/// `vlcrc` under `XDG_CONFIG_HOME`, or `~/.config`.
fn config_file(env: &Environment) -> Option<PathBuf> {
    let base = env
        .get_var("XDG_CONFIG_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| env.home().map(|h| h.join(".config")))?;
    Some(base.join("vlc").join("vlcrc"))
}

/// Create VLC's configuration with defaults unless one exists already.
fn init_config(env: &Environment) -> Result<()> {
    let Some(path) = config_file(env) else {
        return Ok(());
    };
    if !path.exists() {
        file::atomic_write(&path, DEFAULT_VLCRC.as_bytes())?;
        info!("created {}", path.display());
    }
    Ok(())
}

impl Wrapper for Vlc {
    fn name() -> &'static str {
        "vlc"
    }

    fn about() -> &'static str {
        "VLC media player with start-up noise filtered; --daemon detaches."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let vlc = self.build(env)?;
        init_config(env)?;
        if self.daemon {
            let log = file::tmpdir(env, "wrapkit")?.join("vlc.log");
            let pid = Daemon::new(vlc.cmdline()).with_log_file(&log).run(env)?;
            info!("vlc running as pid {} (log {})", pid, log.display());
            return Ok(0);
        }
        let filter = OutputFilter::new().drop_matching(NOISE)?;
        Ok(Task::new(vlc.cmdline()).run(env, &RunOptions::filtered(filter))?)
    }
}
