//! Page downloading.
//!
//! Pages are fetched over plain HTTP on port 80, with one fresh connection per request and without following redirects.

use std::future::Future;

use reqwest::Client;

use crate::Error;

/// Port every page is downloaded from.
pub const HTTP_PORT: u16 = 80;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Where to download a page from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// Host name or address, without any port.
    pub host: String,
    /// Request target: absolute path with its optional query.
    pub path: String,
}

impl Target {
    /// Split a URL into its host and request target.
    ///
    /// A URL without scheme is considered as an `http` one, while any other explicit scheme is rejected. Explicit ports
    /// and user info are rejected too since pages are always downloaded from port 80. Fragments are dropped.
    ///
    /// ```
    /// # use crawler::fetch::Target;
    /// let target = Target::split("http://example.com/a/b?c=d#e").unwrap();
    ///
    /// assert_eq!(target.host, "example.com");
    /// assert_eq!(target.path, "/a/b?c=d");
    /// assert_eq!(Target::split("example.com").unwrap().path, "/");
    /// assert_eq!(Target::split("https://example.com"), None);
    /// ```
    pub fn split(url: &str) -> Option<Self> {
        let url = url.trim();

        let rest = match url.find("://") {
            Some(i) if url[..i].eq_ignore_ascii_case("http") => &url[i + 3..],
            Some(_) => return None,
            None => url,
        };

        let rest = rest.split_once('#').map_or(rest, |(rest, _)| rest);
        let (host, path) = match rest.find(['/', '?']) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        url::Host::parse(host).ok()?;

        let path = match path {
            "" => "/".to_owned(),
            query if query.starts_with('?') => format!("/{query}"),
            path => path.to_owned(),
        };

        Some(Self {
            host: host.to_owned(),
            path,
        })
    }

    /// The absolute URL to request this target on `port`.
    pub fn url(&self, port: u16) -> String {
        format!("http://{}:{port}{}", self.host, self.path)
    }
}

/// A downloaded page, whatever its response status.
#[derive(Debug, Clone)]
pub struct Page {
    /// Full response body.
    pub body: String,
}

impl Page {
    #[inline]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Page downloader interface.
pub trait Fetcher: Send + Sync + 'static {
    /// Download one page, a failure only affects this very page.
    fn fetch(&self, target: &Target) -> impl Future<Output = Result<Page, Error>> + Send;
}

/// The HTTP page downloader.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    port: u16,
}

impl HttpFetcher {
    /// Create a fetcher that never reuses connections nor follows redirects.
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, port: HTTP_PORT })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &Target) -> Result<Page, Error> {
        let resp = self.client.get(target.url(self.port)).send().await?;
        let status = resp.status();

        if !status.is_success() {
            tracing::debug!("Got HTTP {status} from `{}{}`", target.host, target.path);
        }

        Ok(Page::new(resp.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(url: &str) -> Option<(String, String)> {
        Target::split(url).map(|target| (target.host, target.path))
    }

    fn pair(host: &str, path: &str) -> Option<(String, String)> {
        Some((host.to_owned(), path.to_owned()))
    }

    #[test]
    fn test_split_http_urls() {
        assert_eq!(split("http://example.com"), pair("example.com", "/"));
        assert_eq!(split("http://example.com/"), pair("example.com", "/"));
        assert_eq!(split("HTTP://example.com/a/b.html"), pair("example.com", "/a/b.html"));
        assert_eq!(split("http://example.com?q=1"), pair("example.com", "/?q=1"));
        assert_eq!(split("http://example.com/a#top"), pair("example.com", "/a"));
        assert_eq!(split("http://127.0.0.1/index"), pair("127.0.0.1", "/index"));
    }

    #[test]
    fn test_split_without_scheme() {
        assert_eq!(split("example.com"), pair("example.com", "/"));
        assert_eq!(split("  example.com/page  "), pair("example.com", "/page"));
    }

    #[test]
    fn test_split_rejects_other_schemes() {
        assert_eq!(split("https://example.com/"), None);
        assert_eq!(split("ftp://example.com/file"), None);
        assert_eq!(split("httpx://example.com/"), None);
    }

    #[test]
    fn test_split_rejects_malformed_urls() {
        assert_eq!(split(""), None);
        assert_eq!(split("http://"), None);
        assert_eq!(split("/relative/path"), None);
        assert_eq!(split("#anchor"), None);
        assert_eq!(split("mailto:someone@example.com"), None);
        assert_eq!(split("http://example.com:8080/"), None);
        assert_eq!(split("http://user@example.com/"), None);
        assert_eq!(split("http://exa mple.com/"), None);
    }

    #[test]
    fn test_target_url() {
        let target = Target::split("example.com/a?b").unwrap();

        assert_eq!(target.url(HTTP_PORT), "http://example.com:80/a?b");
    }

    #[test]
    fn test_http_fetcher_targets_port_80() {
        assert_eq!(HttpFetcher::new().unwrap().port, HTTP_PORT);
    }

    /// Serve `connections` connections, one request each, always answering with a redirect.
    async fn redirecting_server(connections: usize) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let mut requests = vec![];

            for _ in 0..connections {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut request = vec![];
                let mut buf = [0; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).await.unwrap();
                    assert!(n > 0, "connection closed before a full request");
                    request.extend_from_slice(&buf[..n]);
                }
                let line = String::from_utf8_lossy(&request).lines().next().unwrap_or_default().to_owned();
                requests.push(line);

                stream
                    .write_all(b"HTTP/1.1 302 Found\r\nLocation: /next\r\nContent-Length: 5\r\nConnection: keep-alive\r\n\r\nmoved")
                    .await
                    .unwrap();

                // keep the connection open so that it could be reused
                tokio::spawn(async move {
                    let _ = stream.read(&mut buf).await;
                });
            }

            requests
        });

        (port, server)
    }

    #[tokio::test]
    async fn test_http_fetcher_neither_reuses_connections_nor_follows_redirects() {
        let (port, server) = redirecting_server(2).await;
        let fetcher = HttpFetcher {
            port,
            ..HttpFetcher::new().unwrap()
        };
        let target = Target::split("127.0.0.1/start").unwrap();

        for _ in 0..2 {
            let page = tokio::time::timeout(std::time::Duration::from_secs(5), fetcher.fetch(&target))
                .await
                .expect("redirect should not be followed")
                .unwrap();
            assert_eq!(page.body, "moved");
        }

        let requests = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("every fetch should open its own connection")
            .unwrap();
        assert_eq!(requests, ["GET /start HTTP/1.1", "GET /start HTTP/1.1"]);
    }
}
