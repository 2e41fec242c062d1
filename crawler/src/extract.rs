//! Image and link extraction out of HTML pages.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

static IMAGES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").expect("constant selector"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("constant selector"));

/// References found in a page, deduplicated by value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// `src` attributes of `<img>` elements.
    pub images: BTreeSet<String>,
    /// `href` attributes of `<a>` elements, only collected when asked for.
    pub links: BTreeSet<String>,
}

/// Parse `body` once and collect its images, and its links when `follow_links` is set.
///
/// Malformed markup is parsed the way browsers do, so this never fails. Attribute values are kept as is, except blank ones
/// which are ignored.
pub fn extract(body: &str, follow_links: bool) -> Extraction {
    let document = Html::parse_document(body);

    Extraction {
        images: collect(&document, &IMAGES, "src"),
        links: if follow_links {
            collect(&document, &LINKS, "href")
        } else {
            BTreeSet::new()
        },
    }
}

fn collect(document: &Html, selector: &Selector, attr: &str) -> BTreeSet<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
        values.into_iter().map(str::to_owned).collect()
    }

    #[test]
    fn test_extract_images_and_links() {
        let html = r#"
            <html><body>
                <img src="http://example.com/a.png">
                <p><img src="/b.jpg" alt="b"></p>
                <a href="http://example.com/next">next</a>
                <a name="no-href">anchor</a>
            </body></html>
        "#;

        let extraction = extract(html, true);

        assert_eq!(extraction.images, set(["http://example.com/a.png", "/b.jpg"]));
        assert_eq!(extraction.links, set(["http://example.com/next"]));
    }

    #[test]
    fn test_links_are_skipped_when_not_following() {
        let html = r#"<img src="a.png"><a href="http://example.com/">home</a>"#;

        let extraction = extract(html, false);

        assert_eq!(extraction.images, set(["a.png"]));
        assert!(extraction.links.is_empty());
    }

    #[test]
    fn test_duplicates_are_merged() {
        let html = r#"<img src="a.png"><img src="a.png"><a href="x">1</a><a href="x">2</a>"#;

        let extraction = extract(html, true);

        assert_eq!(extraction.images, set(["a.png"]));
        assert_eq!(extraction.links, set(["x"]));
    }

    #[test]
    fn test_malformed_and_empty_pages() {
        assert_eq!(extract("", true), Extraction::default());
        assert_eq!(extract("HTTP/1.1 404 Not Found", true), Extraction::default());

        let extraction = extract(r#"<div><img src="a.png"<a href="b">"#, true);
        assert!(extraction.links.len() <= 1);

        let extraction = extract(r#"<img src=""><img src="  "><img>"#, true);
        assert!(extraction.images.is_empty());
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let html = r#"<img src=" a.png "><img src="a.png"><a href=" next ">next</a>"#;

        let extraction = extract(html, true);

        assert_eq!(extraction.images, set([" a.png ", "a.png"]));
        assert_eq!(extraction.links, set([" next "]));
    }
}
