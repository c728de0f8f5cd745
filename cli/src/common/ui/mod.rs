//! # Decking Terminal Reporter (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! User-visible progress output. The orchestration code reports through the
//! `Reporter` trait and never prints directly, so the same code drives the
//! colored `Terminal` in the CLI and a recording reporter in tests.
//!
//! Output layout:
//!
//! ```text
//! -----> creating container 'bob'...          (step, green)
//!        (183612dfe2c9)                       (line)
//! -----> 'alice' (7295655e7ff0): Exited (0)   (warning, yellow)
//!  !     details                              (warning/error detail line)
//! ```
//!
//! Diagnostic logging stays on `tracing` (stderr); this module owns stdout.
//!
use colored::Colorize;

/// Step/line/warning/error print primitives.
pub trait Reporter: Send + Sync {
    /// A titled step of progress.
    fn step(&self, title: &str);
    /// A detail line under the current step.
    fn line(&self, line: &str);
    fn warning(&self, title: &str);
    fn error(&self, title: &str, detail: Option<&str>);
}

const STEP_MARK: &str = "----->";
const LINE_INDENT: &str = "      ";
const ALERT_MARK: &str = " !    ";

/// Colored reporter writing to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Reporter for Terminal {
    fn step(&self, title: &str) {
        println!("{} {}", STEP_MARK, title.green());
    }

    fn line(&self, line: &str) {
        println!("{} {}", LINE_INDENT, line);
    }

    fn warning(&self, title: &str) {
        println!("{} {}", STEP_MARK, title.yellow());
    }

    fn error(&self, title: &str, detail: Option<&str>) {
        println!("{} {}", STEP_MARK, title.red());
        if let Some(detail) = detail {
            for line in detail.lines() {
                println!("{} {}", ALERT_MARK.red(), line);
            }
        }
    }
}
