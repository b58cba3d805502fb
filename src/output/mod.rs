mod progress;
mod styling;
mod tables;

pub use progress::WaitProgress;
use styling::{command_name, heading, muted, title};
pub use tables::status_table;

use crate::commands::Registry;

/// Prints the tool banner and every registered command with its summary.
pub fn print_commands(registry: &Registry) {
    println!(
        "{} {}\n  {}\n",
        title("gocd"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("GoCD pipeline command line tool")
    );
    println!("{}", heading("Commands:"));

    let width = registry.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, summary) in registry.iter() {
        println!("  {}  {}", command_name(format!("{name:width$}")), summary);
    }

    println!(
        "\n{}",
        muted("Run `gocd <command> <subcommand> --help` for the options of a command.")
    );
}
