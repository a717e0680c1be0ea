pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;

use colored::Colorize;

pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Print a highlighted, non-fatal problem to stderr.
pub fn warning(message: impl std::fmt::Display) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}
