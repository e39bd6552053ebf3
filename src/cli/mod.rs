//! CLI module - Command-line interface for streamdex
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// streamdex - incremental show catalog crawler
/// Resumes where the previous run stopped; each run attempts a bounded number of episodes
#[derive(Parser)]
#[command(name = "streamdex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one synchronization pass over the listing
    #[command(alias = "s")]
    Sync {
        /// Episodes to attempt this run (overrides sync.episode_budget)
        #[arg(long, short)]
        budget: Option<usize>,

        /// Listing entries to consider (overrides site.max_shows)
        #[arg(long)]
        max_shows: Option<usize>,

        /// Catalog file (overrides general.catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// List shows in the catalog with their progress
    #[command(alias = "ls", alias = "l")]
    List {
        /// Catalog file (overrides general.catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show one catalog entry with its episodes
    #[command(alias = "i")]
    Info {
        /// Show URL or its position in `list`
        id: String,

        /// Catalog file (overrides general.catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
