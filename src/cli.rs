use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding config.yaml and the persisted dataset
    #[clap(long, default_value = ".bms")]
    pub base_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rebuild the chunk dataset from a JSON file of bookmarks
    Sync {
        /// Path to a JSON array of source documents
        #[clap(short, long)]
        input: String,
    },
    /// Search indexed bookmarks
    Search {
        /// The query text
        query: String,

        /// Matching strategy: exact, fuzzy or semantic
        #[clap(short, long, default_value = "semantic")]
        mode: String,

        /// Maximum number of results
        #[clap(short = 'n', long)]
        top_n: Option<usize>,
    },
    /// Print dataset and configuration summary
    Info {},
}
