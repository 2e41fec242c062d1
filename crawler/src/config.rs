use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::Error;

/// Default maximum recursion depth.
pub const DEFAULT_DEPTH: usize = 1;

/// Crawl configuration, fixed for the whole lifetime of a [`Crawler`](crate::Crawler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Seed page address.
    pub url: String,
    /// Maximum depth: links found on pages at this depth are not followed anymore.
    pub depth: usize,
    /// Number of concurrent downloads.
    pub network_threads: NonZeroUsize,
    /// Number of concurrent page extractions.
    pub parser_threads: NonZeroUsize,
    /// Output file receiving one image reference per line.
    pub output: PathBuf,
}

impl Config {
    /// Create a configuration with default depth and host parallelism for both pools.
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            depth: DEFAULT_DEPTH,
            network_threads: default_parallelism(),
            parser_threads: default_parallelism(),
            output: output.into(),
        }
    }

    #[inline]
    pub fn with_depth(self, depth: usize) -> Self {
        Self { depth, ..self }
    }

    #[inline]
    pub fn with_network_threads(self, network_threads: NonZeroUsize) -> Self {
        Self { network_threads, ..self }
    }

    #[inline]
    pub fn with_parser_threads(self, parser_threads: NonZeroUsize) -> Self {
        Self { parser_threads, ..self }
    }

    /// Check what the type system cannot.
    pub fn validate(&self) -> Result<(), Error> {
        if self.url.trim().is_empty() {
            return Err(Error::Config("seed url is empty".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::Config("output path is empty".into()));
        }

        Ok(())
    }
}

/// The host's available parallelism, falling back to a single worker.
pub fn default_parallelism() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("http://example.com", "out.txt");

        assert_eq!(config.depth, DEFAULT_DEPTH);
        assert_eq!(config.network_threads, default_parallelism());
        assert_eq!(config.parser_threads, default_parallelism());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let two = NonZeroUsize::new(2).unwrap();
        let config = Config::new("http://example.com", "out.txt")
            .with_depth(3)
            .with_network_threads(two)
            .with_parser_threads(NonZeroUsize::MIN);

        assert_eq!(config.depth, 3);
        assert_eq!(config.network_threads, two);
        assert_eq!(config.parser_threads, NonZeroUsize::MIN);
    }

    #[test]
    fn test_rejects_empty_values() {
        assert!(matches!(Config::new("  ", "out.txt").validate(), Err(Error::Config(_))));
        assert!(matches!(Config::new("http://example.com", "").validate(), Err(Error::Config(_))));
    }
}
