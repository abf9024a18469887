pub mod console;
pub mod files;

pub use console::*;
pub use files::*;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "filetext", version)]
#[command(about = "Extract plain text from local documents")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Files to add when no subcommand is given
    pub paths: Vec<PathBuf>,
}

impl Cli {
    /// Bare paths mean `add`; no arguments at all mean `list`.
    pub fn into_command(self) -> Command {
        match self.cmd {
            Some(cmd) => cmd,
            None if self.paths.is_empty() => Command::List,
            None => Command::Add { paths: self.paths },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Extract text from files and add them to the session
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show every file with its status
    List,
    /// Print the text of one file, or of every ready file
    Copy { name: Option<String> },
    /// Forget one file
    Remove { name: String },
    /// Forget every file
    Clear,
}
