//! A concurrent crawler collecting image references.
//!
//! Starting from a seed page, the crawler downloads each page, collects every `<img src>` it contains and, while below the
//! configured depth, follows every `<a href>` to do the same on linked pages. Every image reference found is appended as a line
//! to an output sink.
//!
//! The crawl runs as a three-stage pipeline:
//! - a bounded pool of network workers downloading pages,
//! - a bounded pool of parser workers extracting images and links, the latter feeding the network pool back,
//! - a single result writer draining a _multi-producer single-consumer_ queue into the sink.
//!
//! Since parse tasks keep spawning download tasks, the task graph is unknown in advance. Termination is detected by a
//! [`TerminationBarrier`](barrier::TerminationBarrier) counting every outstanding download, parse and queued line: a task always
//! registers the work it spawns before releasing its own unit, so that the counter drops to zero exactly once, when the crawl is
//! complete and drained.
//!
//! As a **strong hypothesis**, links are neither resolved nor deduplicated: the crawl is bounded by its depth only, so that a link
//! cycle just means pages fetched more than once. Only plain `http` URLs are followed.
//!
//! ```no_run
//! # async fn run() -> Result<(), crawler::Error> {
//! use crawler::{Config, Crawler};
//!
//! let crawler = Crawler::start(Config::new("http://example.com", "images.txt").with_depth(2)).await?;
//! let summary = crawler.join().await?;
//!
//! println!("{} image(s) written", summary.stats.lines_written);
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod extract;
pub mod fetch;
pub mod task;

mod config;
mod engine;
mod error;
mod stats;
mod writer;

pub use config::{default_parallelism, Config, DEFAULT_DEPTH};
pub use engine::{Crawler, Summary};
pub use error::Error;
pub use stats::CrawlStats;
