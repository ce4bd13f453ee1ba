//! Interactive yes/no prompts on stdin.
//!
//! Stdin is read on a blocking thread ([`confirm_async`]) so a pending
//! prompt never stalls the async runtime. A prompt abandoned by its caller,
//! for example on Ctrl-C, leaves that thread waiting for one more line.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Asks `question` until the answer is yes or no.
///
/// End of input or a read error counts as "no".
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> bool {
    loop {
        let _ = write!(output, "{} {question} [Y/N]: ", "[PROMPT]".cyan());
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read user input: {e}");
                return false;
            }
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => {}
        }
    }
}

/// Asks `question` on the terminal.
pub fn confirm(question: &str) -> bool {
    let stdin = io::stdin();
    let stdout = io::stdout();
    ask(&mut stdin.lock(), &mut stdout.lock(), question)
}

/// Asks `question` on the terminal without blocking the async runtime.
pub async fn confirm_async(question: impl Into<String>) -> bool {
    let question = question.into();
    answer_off_runtime(move || confirm(&question)).await
}

async fn answer_off_runtime<F>(read: F) -> bool
where
    F: FnOnce() -> bool + Send + 'static,
{
    match tokio::task::spawn_blocking(read).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Prompt failed: {e}");
            false
        }
    }
}

/// Waits for Enter so a console window opened by double-click stays readable.
pub fn pause() {
    print!("Press Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}
