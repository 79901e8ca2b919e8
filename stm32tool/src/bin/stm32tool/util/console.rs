//! User facing console output.

use std::fmt::Display;

use colored::Colorize;

pub fn info(message: impl Display) {
    println!("{} {message}", "[INFO]".blue());
}

pub fn warning(message: impl Display) {
    eprintln!("{} {message}", "[WARNING]".yellow());
}

pub fn error(message: impl Display) {
    eprintln!("{} {message}", "[ERROR]".red().bold());
}

/// Prints a labelled row, with the values of consecutive rows aligned.
pub fn row(label: &str, value: impl Display) {
    println!("{} {value}", format!("{:<10}", format!("[{label}]")).yellow().bold());
}
