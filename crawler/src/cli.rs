use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use crawler::{default_parallelism, Config, DEFAULT_DEPTH};

/// Crawl web pages from a seed URL and write every image reference found to a file.
#[derive(Parser, Debug)]
#[command(name = "crawler", version)]
pub struct Cli {
    /// HTML page address
    #[arg(long)]
    pub url: String,

    /// Page search depth
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Number of downloader workers
    #[arg(long = "network_threads", default_value_t = default_parallelism())]
    pub network_threads: NonZeroUsize,

    /// Number of parser workers
    #[arg(long = "parser_threads", default_value_t = default_parallelism())]
    pub parser_threads: NonZeroUsize,

    /// Path to output file
    #[arg(long)]
    pub output: PathBuf,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config::new(cli.url, cli.output)
            .with_depth(cli.depth)
            .with_network_threads(cli.network_threads)
            .with_parser_threads(cli.parser_threads)
    }
}
