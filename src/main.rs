//! Paper launcher entry point
//!
//! Parses the command line, runs the launch sequence, and renders any error
//! with a suggestion. Unless `--no-pause` is given the window waits for Enter
//! before closing, so a launcher started by double-click stays readable.

use clap::Parser;
use paper_launcher::cli::{self, prompt};
use paper_launcher::core::error::user_friendly_error;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let no_pause = cli.no_pause();

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        eprintln!("Unexpected error (panic); the launcher will exit");
        if !no_pause {
            prompt::pause();
        }
        std::process::exit(1);
    }));

    let result = cli.execute().await;

    if let Err(e) = result {
        let error_ctx = user_friendly_error(e);
        error_ctx.display();
        if !no_pause {
            prompt::pause();
        }
        std::process::exit(1);
    }

    if !no_pause {
        prompt::pause();
    }
}
