//! Bounded interactive choice among equally plausible search hits.
//!
//! Automatic selection among ambiguous candidates is disallowed: attaching a
//! wrong identifier to a document is worse than leaving it unresolved, so the
//! non-interactive default always declines.

use std::io::{self, BufRead, Write};

use crate::sources::SearchHit;

/// Console input seam, so tests never block on stdin.
pub trait Prompter: Send + Sync {
    fn ask(&self, prompt: &str) -> Option<String>;
}

pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line)
    }
}

pub struct Disambiguator {
    interactive: bool,
    prompter: Box<dyn Prompter>,
}

impl Disambiguator {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            prompter: Box::new(ConsolePrompter),
        }
    }

    pub fn with_prompter(interactive: bool, prompter: Box<dyn Prompter>) -> Self {
        Self {
            interactive,
            prompter,
        }
    }

    /// Pick one hit or decline. Interactive mode lists the candidates with
    /// 1-based indices and reads a single number; 0, a non-numeric answer or
    /// an out-of-range index all decline. Non-interactive mode declines
    /// without touching the console.
    pub fn choose(&self, hits: &[SearchHit]) -> Option<String> {
        if hits.is_empty() || !self.interactive {
            return None;
        }

        for (idx, hit) in hits.iter().enumerate() {
            println!("{}: {} => {}", idx + 1, hit.identifier, hit.title);
        }

        let answer = self.prompter.ask("Enter article number or 0 to quit --> ")?;
        let choice = answer.trim().parse::<usize>().ok()?;
        if choice == 0 || choice > hits.len() {
            return None;
        }
        Some(hits[choice - 1].identifier.clone())
    }
}
