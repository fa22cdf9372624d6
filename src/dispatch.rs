use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::WrapError;
use crate::wrapper::WrapperFactory;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name of the multi-call binary itself.
pub const PROGRAM: &str = "wrapkit";

/// Factory allows creating instances of a [`crate::wrapper::Runnable`].
///
/// Only supports wrappers defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Runs wrappers by name.
///
/// The dispatcher owns the [`Environment`] wrappers see and the list of
/// [`WrapperFactory`] objects queried to create them. See [`Default`] for the
/// wrappers included out of the box.
///
/// Example
/// ```no_run
/// use wrapkit::Dispatcher;
/// let mut wrappers = Dispatcher::default();
/// let code = wrappers.run("which", &["sh"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Dispatcher {
    env: Environment,
    wrappers: Vec<Box<dyn WrapperFactory>>,
}

impl Dispatcher {
    /// Create a dispatcher with a custom set of wrapper factories.
    pub fn new(env: Environment, wrappers: Vec<Box<dyn WrapperFactory>>) -> Self {
        Self { env, wrappers }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.wrappers.iter().map(|w| w.name()).collect()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run one wrapper by name, printing to standard output.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let mut stdout = std::io::stdout();
        self.run_with_output(name, args, &mut stdout)
    }

    /// Run one wrapper by name, sending its own messages to `stdout`.
    pub fn run_with_output(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.wrappers {
            if let Some(cmd) = factory.try_create(name, args) {
                debug!("running wrapper {} {:?}", name, args);
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("unknown tool: {}", name))
    }

    /// Entry point for the multi-call binary.
    ///
    /// The tool is the basename of `argv[0]` when that names a wrapper
    /// (symlink install), otherwise the first argument.
    pub fn main_entry(&mut self, argv: &[String]) -> ExitCode {
        let invoked = argv
            .first()
            .and_then(|a| Path::new(a).file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| PROGRAM.to_string());

        let (tool, rest) = if self.names().contains(&invoked.as_str()) {
            (invoked, argv.get(1..).unwrap_or_default())
        } else {
            match argv.get(1).map(String::as_str) {
                None => {
                    let _ = self.print_tools(&mut std::io::stderr());
                    return 2;
                }
                Some("-h") | Some("--help") | Some("help") => {
                    let _ = self.print_tools(&mut std::io::stdout());
                    return 0;
                }
                Some(tool) => (tool.to_string(), &argv[2..]),
            }
        };

        if !self.names().contains(&tool.as_str()) {
            eprintln!("{}: unknown tool \"{}\"", PROGRAM, tool);
            let _ = self.print_tools(&mut std::io::stderr());
            return 2;
        }

        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        match self.run(&tool, &args) {
            Ok(code) => code,
            Err(err) => report(&tool, &err),
        }
    }

    fn print_tools(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Usage: {} <tool> [args...]\n\nTools:", PROGRAM)?;
        for factory in &self.wrappers {
            writeln!(out, "  {:<10} {}", factory.name(), factory.description())?;
        }
        Ok(())
    }
}

/// Print `err` for the user and pick the exit code.
fn report(tool: &str, err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<WrapError>() {
        Some(WrapError::Interrupted) => WrapError::Interrupted.exit_code(),
        Some(wrap_err) => {
            eprintln!("{}: {}", tool, wrap_err);
            wrap_err.exit_code()
        }
        None => {
            eprintln!("{}: {:#}", tool, err);
            1
        }
    }
}

impl Default for Dispatcher {
    /// Create a dispatcher with every bundled wrapper.
    fn default() -> Self {
        use crate::wrappers::*;
        Self::new(
            Environment::new(),
            vec![
                Box::new(Factory::<Which>::default()),
                Box::new(Factory::<Xz>::default()),
                Box::new(Factory::<Tar>::default()),
                Box::new(Factory::<Vi>::default()),
                Box::new(Factory::<Vlc>::default()),
                Box::new(Factory::<Wget>::default()),
                Box::new(Factory::<Pip>::default()),
                Box::new(Factory::<Game>::default()),
                Box::new(Factory::<Convert>::default()),
            ],
        )
    }
}
