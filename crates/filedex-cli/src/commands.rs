use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "filedex")]
#[command(about = "File catalog and duplicate finder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index the given root paths (default: configured root_paths)
    Index {
        paths: Vec<String>,
    },
    /// Run a duplicate scan under a root
    Scan {
        root: String,
    },
    /// Print duplicate groups found by the last scan
    Groups {
        /// Restrict groups to files under this directory
        #[arg(long)]
        root: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Search the catalog by name or snippet content
    Search {
        query: String,
        /// Filter on extension (lowercase, no dot)
        #[arg(long)]
        ext: Option<String>,
        /// Filter on category (image, video, audio, doc, archive, code, folder, other)
        #[arg(long = "type")]
        file_type: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show catalog and job status
    Status,
    /// Delete files (trash when possible) and drop their catalog records
    Delete {
        paths: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show recent destructive operations
    History {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all catalog tables
    TruncateDb,
}
