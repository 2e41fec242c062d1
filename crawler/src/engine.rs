//! The crawl engine, wiring download and parse pools to the result writer.

use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncWrite, BufWriter};
use tokio::task::JoinHandle;

use crate::barrier::TerminationBarrier;
use crate::extract::{self, Extraction};
use crate::fetch::{Fetcher, HttpFetcher, Page, Target};
use crate::stats::{CrawlStats, Stats};
use crate::task::{Pool, Spawner};
use crate::writer::{self, Queue};
use crate::{Config, Error};

/// What a finished crawl leaves behind.
#[derive(Debug)]
pub struct Summary<W> {
    /// The flushed output sink.
    pub sink: W,
    /// Crawl counters.
    pub stats: CrawlStats,
}

/// A running crawl.
///
/// The crawl starts as soon as the crawler is created: the seed page is scheduled for download at depth 0 and every page
/// found along the way is handled in the background. Use [`Crawler::join()`] to wait for the whole crawl to complete.
#[derive(Debug)]
pub struct Crawler<W> {
    network: Pool,
    parser: Pool,
    writer: JoinHandle<W>,
    barrier: Arc<TerminationBarrier>,
    stats: Arc<Stats>,
}

impl Crawler<BufWriter<File>> {
    /// Start crawling over HTTP into the configured output file, which is created or truncated.
    pub async fn start(config: Config) -> Result<Self, Error> {
        config.validate()?;

        let file = File::create(&config.output).await?;

        Self::with_parts(config, HttpFetcher::new()?, BufWriter::new(file))
    }
}

impl<W> Crawler<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Start crawling with a given fetcher and output sink.
    ///
    /// # Panics
    /// This function panics if called outside of a Tokio runtime.
    pub fn with_parts<F: Fetcher>(config: Config, fetcher: F, sink: W) -> Result<Self, Error> {
        Self::assemble(config, fetcher, sink, extract::extract)
    }

    fn assemble<F: Fetcher>(config: Config, fetcher: F, sink: W, extractor: Extractor) -> Result<Self, Error> {
        config.validate()?;

        let barrier = TerminationBarrier::new();
        let stats = Arc::new(Stats::default());

        let mut network = Pool::named("network");
        network.start(config.network_threads);
        let mut parser = Pool::named("parser");
        parser.start(config.parser_threads);

        let (queue, writer) = writer::spawn(sink, Arc::clone(&barrier), Arc::clone(&stats));

        let dispatcher = Arc::new(Dispatcher {
            fetcher,
            extractor,
            network: network.spawner(),
            parser: parser.spawner(),
            queue,
            barrier: Arc::clone(&barrier),
            stats: Arc::clone(&stats),
            max_depth: config.depth,
        });

        tracing::info!(
            "Crawling `{}` up to depth {} with {} network and {} parser workers.",
            config.url,
            config.depth,
            config.network_threads,
            config.parser_threads,
        );

        dispatcher.download(config.url, 0);

        Ok(Self {
            network,
            parser,
            writer,
            barrier,
            stats,
        })
    }

    /// Wait for the crawl to complete.
    ///
    /// Returns once no download, parse or write is pending anymore, the writer has flushed the sink and every worker has
    /// been stopped. Waiting does not cancel anything.
    pub async fn join(self) -> Result<Summary<W>, Error> {
        self.barrier.wait_for_quiescence().await;

        let sink = self.writer.await?;

        self.network.close().await;
        self.parser.close().await;

        let stats = self.stats.snapshot();

        tracing::info!(
            "Crawl complete: {} page(s) fetched, {} image(s) written.",
            stats.pages_fetched,
            stats.lines_written,
        );

        Ok(Summary { sink, stats })
    }
}

/// Collects images, and links when asked for, out of a page body.
type Extractor = fn(&str, bool) -> Extraction;

/// Everything a crawl task may reach: immutable settings and internally synchronized handles.
struct Dispatcher<F> {
    fetcher: F,
    extractor: Extractor,
    network: Spawner,
    parser: Spawner,
    queue: Queue,
    barrier: Arc<TerminationBarrier>,
    stats: Arc<Stats>,
    max_depth: usize,
}

impl<F: Fetcher> Dispatcher<F> {
    /// Schedule `url` for download on the network pool.
    fn download(self: &Arc<Self>, url: String, depth: usize) {
        debug_assert!(depth <= self.max_depth);

        let unit = self.barrier.acquire();
        self.stats.scheduled_at(depth);

        let this = Arc::clone(self);
        self.network.forget(async move {
            let Some(target) = Target::split(&url) else {
                tracing::trace!("Skipping unsupported url `{url}`.");
                this.stats.url_skipped();
                return;
            };

            tracing::trace!("Downloading `{url}` at depth {depth}...");

            match this.fetcher.fetch(&target).await {
                Ok(page) => {
                    this.stats.page_fetched();
                    this.parse(page, depth);
                }
                Err(err) => {
                    tracing::warn!("Failed to download `{url}`: {err}");
                    this.stats.fetch_failed();
                }
            }

            // released only once the parse task holds its own unit
            unit.release();
        });
    }

    /// Schedule `page` for extraction on the parser pool.
    fn parse(self: &Arc<Self>, page: Page, depth: usize) {
        let unit = self.barrier.acquire();

        let this = Arc::clone(self);
        self.parser.forget(async move {
            let follow_links = depth < this.max_depth;
            let body = page.body;
            let extractor = this.extractor;

            let Extraction { images, links } =
                match tokio::task::spawn_blocking(move || extractor(&body, follow_links)).await {
                    Ok(extraction) => extraction,
                    Err(err) => {
                        tracing::warn!("Failed to parse page at depth {depth}: {err}");
                        this.stats.parse_failed();
                        Extraction::default()
                    }
                };

            tracing::trace!("Found {} image(s) and {} link(s) at depth {depth}.", images.len(), links.len());

            for image in images {
                this.stats.image_queued();
                this.queue.push(image, this.barrier.acquire());
            }

            for link in links {
                this.download(link, depth + 1);
            }

            unit.release();
        });
    }
}
