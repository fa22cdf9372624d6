use wrapkit::config::Settings;
use wrapkit::env::Environment;
use wrapkit::{Dispatcher, EXIT_INTERRUPTED, logging};

fn main() {
    // Reset SIGPIPE to default behavior to prevent panic on broken pipe
    // (e.g., when piping to `head` or `less` that exits early)
    #[cfg(unix)]
    reset_sigpipe();

    if let Err(e) = ctrlc::set_handler(|| std::process::exit(EXIT_INTERRUPTED)) {
        eprintln!("{}: cannot install Ctrl-C handler: {}", wrapkit::PROGRAM, e);
    }

    let env = Environment::new();
    logging::init(&Settings::from_env(&env));

    let argv: Vec<String> = std::env::args().collect();
    let code = Dispatcher::default().main_entry(&argv);
    std::process::exit(code);
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
