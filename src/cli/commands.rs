//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paged directory search service
#[derive(Parser, Debug)]
#[command(name = "dirsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory fixture to serve searches from (YAML)
    #[arg(short, long, global = true)]
    pub directory: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Run a query and print one page
    Query {
        #[command(flatten)]
        query: QueryArgs,

        /// Page to print (1-indexed)
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Run a query and export every result
    Export {
        #[command(flatten)]
        query: QueryArgs,

        /// Export format (csv or json)
        #[arg(long = "export-format", default_value = "csv")]
        export_format: String,

        /// Only export records with these identities (repeatable)
        #[arg(long = "select")]
        selected_ids: Vec<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the default attributes of an object type
    Attributes {
        /// Object type (computers, users, groups)
        object_type: String,
    },
}

/// Query parameters shared by `query` and `export`
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Raw search filter
    #[arg(long, conflicts_with = "object_type")]
    pub filter: Option<String>,

    /// Object type to search for (computers, users, groups)
    #[arg(short = 't', long)]
    pub object_type: Option<String>,

    /// Search term for object type queries
    #[arg(short, long)]
    pub search: Option<String>,

    /// Attributes to return (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub attributes: Vec<String>,

    /// Partition to search (repeatable, in result order)
    #[arg(long = "partition")]
    pub partitions: Vec<String>,

    /// Page size
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    Pretty,
}
