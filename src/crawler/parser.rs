//! HTML parser for extracting crawl targets
//!
//! This module handles parsing HTML content to extract:
//! - Anchors (`<a href>`) with their text and dofollow flag
//! - `<link href>` tags with their `rel`
//! - `<script src>` and `<img src>` resources
//! - The page title
//!
//! Everything is resolved to absolute URLs up front and returned as owned
//! data, so no DOM handle outlives the call.

use crate::crawler::task::TaskOptions;
use crate::url::resolve_link;
use scraper::{Html, Selector};
use url::Url;

/// An `<a href>` found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub url: Url,
    pub text: String,
    pub is_do_follow: bool,
}

/// A `<link href>` found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub url: Url,
    /// Lowercase `rel` attribute
    pub rel: String,
}

/// An `<img src>` found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: Url,
    pub alt: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,
    pub anchors: Vec<Anchor>,
    pub link_tags: Vec<LinkTag>,
    pub scripts: Vec<Url>,
    pub images: Vec<Image>,
}

/// A crawl target selected from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    Link {
        url: Url,
        anchor: String,
        is_do_follow: bool,
    },
    Image {
        url: Url,
        alt: String,
    },
}

impl Discovered {
    pub fn url(&self) -> &Url {
        match self {
            Discovered::Link { url, .. } | Discovered::Image { url, .. } => url,
        }
    }

    pub fn anchor(&self) -> &str {
        match self {
            Discovered::Link { anchor, .. } => anchor,
            Discovered::Image { .. } => "",
        }
    }

    pub fn is_do_follow(&self) -> bool {
        match self {
            Discovered::Link { is_do_follow, .. } => *is_do_follow,
            Discovered::Image { .. } => true,
        }
    }
}

impl ParsedPage {
    /// Targets worth analysing under the given options, in document order per tag type
    ///
    /// Anchors are always included. Link tags need `links` and a `rel` listed
    /// in `link_types`; scripts need `scripts`; images need `images`.
    pub fn discovered(&self, options: &TaskOptions) -> Vec<Discovered> {
        let mut out: Vec<Discovered> = self
            .anchors
            .iter()
            .map(|a| Discovered::Link {
                url: a.url.clone(),
                anchor: a.text.clone(),
                is_do_follow: a.is_do_follow,
            })
            .collect();

        if options.links {
            out.extend(
                self.link_tags
                    .iter()
                    .filter(|tag| {
                        tag.rel
                            .split_whitespace()
                            .any(|rel| options.link_types.iter().any(|t| t == rel))
                    })
                    .map(|tag| Discovered::Link {
                        url: tag.url.clone(),
                        anchor: String::new(),
                        is_do_follow: true,
                    }),
            );
        }

        if options.scripts {
            out.extend(self.scripts.iter().map(|url| Discovered::Link {
                url: url.clone(),
                anchor: String::new(),
                is_do_follow: true,
            }));
        }

        if options.images {
            out.extend(self.images.iter().map(|img| Discovered::Image {
                url: img.url.clone(),
                alt: img.alt.clone(),
            }));
        }

        out
    }
}

/// Returns true if a body looks like a markup document
pub fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Parses HTML content and extracts crawl targets and metadata
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.anchors[0].url.as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        anchors: extract_anchors(&document, base_url),
        link_tags: extract_link_tags(&document, base_url),
        scripts: extract_attr_urls(&document, base_url, "script[src]", "src"),
        images: extract_images(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_anchors(document: &Html, base_url: &Url) -> Vec<Anchor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let url = resolve_link(base_url, element.value().attr("href")?)?;
            let is_do_follow = !element
                .value()
                .attr("rel")
                .map(|rel| {
                    rel.split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("nofollow"))
                })
                .unwrap_or(false);
            let text = element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            Some(Anchor {
                url,
                text,
                is_do_follow,
            })
        })
        .collect()
}

fn extract_link_tags(document: &Html, base_url: &Url) -> Vec<LinkTag> {
    let Ok(selector) = Selector::parse("link[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let url = resolve_link(base_url, element.value().attr("href")?)?;
            let rel = element.value().attr("rel").unwrap_or("").to_lowercase();
            Some(LinkTag { url, rel })
        })
        .collect()
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<Image> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let url = resolve_link(base_url, element.value().attr("src")?)?;
            let alt = element.value().attr("alt").unwrap_or("").trim().to_string();
            Some(Image { url, alt })
        })
        .collect()
}

fn extract_attr_urls(document: &Html, base_url: &Url, css: &str, attr: &str) -> Vec<Url> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| resolve_link(base_url, element.value().attr(attr)?))
        .collect()
}
