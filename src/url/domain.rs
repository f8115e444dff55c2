use url::{Host, Url};

/// Public suffixes made of two labels
///
/// Anything not listed here is treated as a single-label suffix.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "ltd.uk", "plc.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.jp", "ne.jp", "or.jp", "ac.jp",
    "co.nz", "org.nz", "net.nz",
    "com.br", "net.br", "org.br",
    "com.cn", "net.cn", "org.cn",
    "co.in", "net.in", "org.in",
    "co.za", "org.za",
    "com.mx", "org.mx",
    "co.kr", "or.kr",
    "com.tr", "com.sg", "com.hk", "com.tw", "com.ar",
];

/// Returns the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_crawl::url::host;
///
/// let url = Url::parse("https://Blog.Example.com:8080/post").unwrap();
/// assert_eq!(host(&url), Some("blog.example.com".to_string()));
/// ```
pub fn host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the public suffix of a URL's host (`com`, `co.uk`, ...)
///
/// IP literals and single-label hosts have an empty suffix.
pub fn public_suffix(url: &Url) -> Option<String> {
    let host = match url.host()? {
        Host::Domain(d) => d.to_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return Some(String::new()),
    };

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return Some(String::new());
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if labels.len() > 2 && MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        Some(last_two)
    } else {
        Some(labels[labels.len() - 1].to_string())
    }
}

/// Returns the registrable domain of a URL's host
///
/// The registrable domain is the public suffix plus one label. IP literals
/// and single-label hosts are their own domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_crawl::url::registrable_domain;
///
/// let url = Url::parse("https://www.shop.example.co.uk/").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.co.uk".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    let host = host(url)?;
    let suffix = public_suffix(url)?;
    if suffix.is_empty() {
        return Some(host);
    }

    let suffix_labels = suffix.split('.').count();
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= suffix_labels {
        return Some(host);
    }

    Some(labels[labels.len() - suffix_labels - 1..].join("."))
}
