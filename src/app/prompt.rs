//! Yes/no questions asked on the terminal.

use std::io::{BufRead, Write};

use indicatif::HumanBytes;
use tracing::warn;

use coursevault_core::Decisions;
use coursevault_core::index::IndexSummary;

/// Asks the operator each question, reading answers line by line.
///
/// End of input or a read error counts as "no".
pub(crate) struct InteractiveDecisions<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractiveDecisions<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> bool {
        loop {
            let prompt = write!(self.output, "{question} [y/n]: ").and_then(|()| self.output.flush());
            if let Err(error) = prompt {
                warn!(%error, "cannot write prompt");
                return false;
            }
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => return false,
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, "cannot read answer");
                    return false;
                }
            }
            match parse_answer(&line) {
                Some(answer) => return answer,
                None => {
                    let _ = writeln!(self.output, "Please answer 'y' or 'n'.");
                }
            }
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl<R: BufRead, W: Write> Decisions for InteractiveDecisions<R, W> {
    fn reindex(&mut self, existing: &IndexSummary) -> bool {
        self.ask(&format!(
            "Found a saved index with {} courses and {} files ({}), {} downloaded. Rebuild it from the portal?",
            existing.courses,
            existing.files,
            HumanBytes(existing.bytes),
            existing.downloaded
        ))
    }

    fn redownload(&mut self, reindexing: bool) -> bool {
        // A fresh crawl already reflects what is on disk.
        if reindexing {
            return false;
        }
        self.ask("Download every file again, replacing local copies?")
    }

    fn proceed(&mut self, files: usize, bytes: u64) -> bool {
        self.ask(&format!("Download {files} files ({})?", HumanBytes(bytes)))
    }
}
