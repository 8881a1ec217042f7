//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{DeployAction, Outcome};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print success status indented (green checkmark with leading spaces)
pub fn success_detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print plain output (no color, for query results)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print what each executed step produced.
pub fn outcomes(outcomes: &[Outcome]) {
    for outcome in outcomes {
        match outcome {
            Outcome::Initialized { files } => {
                success("Initialized procedure project");
                for file in files {
                    success_detail(&file.display());
                }
            }
            Outcome::Packaged { artifact } => action("Packaged", &artifact.display()),
            Outcome::Deployed(deployment) => {
                let msg = format!(
                    "{} {} {}",
                    deployment.kind, deployment.signature, deployment.action
                );
                match deployment.action {
                    DeployAction::Uploaded => {
                        action("Uploaded", &format!("{msg} (no metadata changes)"))
                    }
                    _ => success(&msg),
                }
            }
            Outcome::Output(text) => info(text.trim_end()),
        }
    }
}
