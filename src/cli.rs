//! CLI definitions and plumbing.

use std::path::Path;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more; repeat for more detail
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a workspace and print every socket type and type error
    Check {
        #[arg(short = 'i', long)]
        input: Box<Path>,
    },
    /// Print the expression produced by a node
    Build {
        #[arg(short = 'i', long)]
        input: Box<Path>,
        #[arg(short = 'r', long)]
        root: Box<str>,
    },
    /// List the user types, constructors and case signatures of a workspace
    Types {
        #[arg(short = 'i', long)]
        input: Box<Path>,
    },
}
