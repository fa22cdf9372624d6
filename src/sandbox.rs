//! Restricted filesystem view for GUI and game launchers.
//!
//! A [`Sandbox`] wraps a [`Command`] in `bwrap` (bubblewrap): the root
//! filesystem is mounted read-only, `/tmp` and the home directory are
//! replaced by empty tmpfs mounts and the network is unshared. Each
//! [`Access`] grant punches a hole back through. This keeps programs from
//! scribbling over the home directory; it is not a security boundary.

use crate::command::{Command, Missing};
use crate::config::Settings;
use crate::env::Environment;
use crate::error::{Result, WrapError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

const BWRAP: &str = "bwrap";

/// One permission granted to a sandboxed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Keep network access.
    Network,
    /// Bind a device node or device directory.
    Device(PathBuf),
    /// Bind a path read-write.
    ReadWrite(PathBuf),
    /// Bind a path read-only.
    ReadOnly(PathBuf),
}

impl FromStr for Access {
    type Err = WrapError;

    /// `net`, `/dev/...`, `/path` or `/path:ro`.
    fn from_str(s: &str) -> Result<Self> {
        if s == "net" {
            return Ok(Access::Network);
        }
        let (path, read_only) = match s.strip_suffix(":ro") {
            Some(path) => (path, true),
            None => (s, false),
        };
        let path = PathBuf::from(path);
        if !path.is_absolute() {
            return Err(WrapError::Usage(format!(
                "sandbox access must be \"net\" or an absolute path: {}",
                s
            )));
        }
        Ok(if path.starts_with("/dev") {
            Access::Device(path)
        } else if read_only {
            Access::ReadOnly(path)
        } else {
            Access::ReadWrite(path)
        })
    }
}

impl Access {
    fn path(&self) -> Option<&Path> {
        match self {
            Access::Network => None,
            Access::Device(p) | Access::ReadWrite(p) | Access::ReadOnly(p) => Some(p),
        }
    }
}

/// A command launched inside a bubblewrap sandbox.
#[derive(Debug, Clone)]
pub struct Sandbox {
    command: Command,
    bwrap: Option<Command>,
    home: Option<PathBuf>,
    access: Vec<Access>,
}

impl Sandbox {
    /// Falls back to running unrestricted when `bwrap` is unavailable or
    /// sandboxing is disabled through `WRAPKIT_NO_SANDBOX`.
    pub fn new(command: Command, env: &Environment) -> Result<Self> {
        let bwrap = if Settings::from_env(env).sandbox_enabled {
            let bwrap = Command::new(BWRAP, env, Missing::Ignore)?;
            if !bwrap.is_found() {
                warn!(
                    "\"{}\" not installed, running {} without sandbox",
                    BWRAP,
                    command.name()
                );
            }
            Some(bwrap).filter(Command::is_found)
        } else {
            debug!("sandbox disabled, running {} directly", command.name());
            None
        };
        Ok(Self {
            command,
            bwrap,
            home: env.home(),
            access: Vec::new(),
        })
    }

    /// Grant access; missing paths are skipped with a warning.
    pub fn sandbox<S: AsRef<str>>(&mut self, grants: &[S]) -> Result<()> {
        for grant in grants {
            let access: Access = grant.as_ref().parse()?;
            if let Some(path) = access.path() {
                if !path.exists() {
                    warn!("sandbox: skipping missing path {}", path.display());
                    continue;
                }
            }
            if !self.access.contains(&access) {
                self.access.push(access);
            }
        }
        Ok(())
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut Command {
        &mut self.command
    }

    pub fn is_active(&self) -> bool {
        self.bwrap.is_some()
    }

    pub fn access(&self) -> &[Access] {
        &self.access
    }

    pub fn cmdline(&self) -> Vec<String> {
        match &self.bwrap {
            Some(bwrap) => {
                let mut cmdline = vec![bwrap.cmdline().remove(0)];
                cmdline.extend(self.bwrap_args());
                cmdline.push("--".to_string());
                cmdline.extend(self.command.cmdline());
                cmdline
            }
            None => self.command.cmdline(),
        }
    }

    fn bwrap_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--ro-bind", "/", "/", "--dev", "/dev", "--proc", "/proc", "--tmpfs", "/tmp",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if let Some(home) = &self.home {
            args.push("--tmpfs".to_string());
            args.push(home.to_string_lossy().into_owned());
        }
        args.push("--die-with-parent".to_string());
        if !self.access.contains(&Access::Network) {
            args.push("--unshare-net".to_string());
        }
        for access in &self.access {
            let flag = match access {
                Access::Network => continue,
                Access::Device(_) => "--dev-bind",
                Access::ReadWrite(_) => "--bind",
                Access::ReadOnly(_) => "--ro-bind",
            };
            if let Some(path) = access.path() {
                let path = path.to_string_lossy().into_owned();
                args.extend([flag.to_string(), path.clone(), path]);
            }
        }
        args
    }
}
