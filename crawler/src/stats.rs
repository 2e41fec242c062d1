use std::sync::atomic::{AtomicUsize, Ordering};

/// Live crawl counters, shared by every task of a crawl.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    pages_fetched: AtomicUsize,
    fetch_failures: AtomicUsize,
    skipped_urls: AtomicUsize,
    parse_failures: AtomicUsize,
    images_queued: AtomicUsize,
    lines_written: AtomicUsize,
    write_failures: AtomicUsize,
    deepest: AtomicUsize,
}

macro_rules! record {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl Stats {
    record! {
        page_fetched => pages_fetched,
        fetch_failed => fetch_failures,
        url_skipped => skipped_urls,
        parse_failed => parse_failures,
        image_queued => images_queued,
        line_written => lines_written,
        write_failed => write_failures,
    }

    #[inline]
    pub(crate) fn scheduled_at(&self, depth: usize) {
        self.deepest.fetch_max(depth, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            skipped_urls: self.skipped_urls.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            images_queued: self.images_queued.load(Ordering::Relaxed),
            lines_written: self.lines_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            deepest: self.deepest.load(Ordering::Relaxed),
        }
    }
}

/// Counters of a finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages successfully downloaded.
    pub pages_fetched: usize,
    /// Downloads that failed, their pages were not parsed.
    pub fetch_failures: usize,
    /// URLs dropped because they could not be split into a host and a target.
    pub skipped_urls: usize,
    /// Pages whose extraction failed.
    pub parse_failures: usize,
    /// Image references pushed to the writer.
    pub images_queued: usize,
    /// Lines appended to the sink.
    pub lines_written: usize,
    /// Lines lost to sink errors.
    pub write_failures: usize,
    /// Deepest depth a download was scheduled at.
    pub deepest: usize,
}
