//! Round-robin proxy rotation

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out configured proxies in turn, one per request attempt
#[derive(Debug, Default)]
pub struct ProxyRotator {
    proxies: Vec<String>,
    next: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            next: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Next proxy in the rotation, or `fallback` when none are configured
    pub fn next_or(&self, fallback: Option<&str>) -> Option<String> {
        if self.proxies.is_empty() {
            return fallback.map(str::to_string);
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[i].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let rotator = ProxyRotator::new(vec!["http://p1:1".to_string(), "http://p2:2".to_string()]);

        assert_eq!(rotator.next_or(None).as_deref(), Some("http://p1:1"));
        assert_eq!(rotator.next_or(None).as_deref(), Some("http://p2:2"));
        assert_eq!(rotator.next_or(Some("http://task:9")).as_deref(), Some("http://p1:1"));
    }

    #[test]
    fn test_falls_back_to_task_proxy() {
        let rotator = ProxyRotator::default();
        assert!(rotator.is_empty());
        assert_eq!(rotator.next_or(None), None);
        assert_eq!(rotator.next_or(Some("http://task:9")).as_deref(), Some("http://task:9"));
    }
}
