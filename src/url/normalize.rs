use crate::UrlError;
use url::Url;

/// Normalizes a URL string into the form used as a history/depth key
///
/// The URL is parsed (which lowercases the host and removes dot segments),
/// must use `http` or `https` with a host, and loses its fragment.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.com/a/../page#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if !url.has_host() {
        return Err(UrlError::MissingHost(url_str.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an `href`/`src` value found on `base` into an absolute URL
///
/// Returns `None` for empty or unparseable references. Non-HTTP schemes such
/// as `mailto:` are kept; the link policy decides whether they are crawlable.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}
