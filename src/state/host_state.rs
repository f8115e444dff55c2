use std::time::Duration;

/// What recording an error did to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Below the error threshold; nothing changed but the counter
    None,
    /// Moved to the given rung of the error-rate ladder
    RateLimited(usize),
    /// Ladder exhausted; the host is stopped for the rest of the run
    Stopped,
}

/// Tracks the error state of a host during crawling
///
/// A host moves `Normal -> RateLimited(0) -> ... -> RateLimited(n-1) -> Stopped`.
/// `Stopped` is terminal for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostErrorState {
    pub host: String,

    /// Retryable errors since the last escalation
    pub number_of_errors: u32,

    /// Current rung of the error-rate ladder, once escalated
    pub current_rate_limit_index: Option<usize>,

    /// Whether requests to this host are delayed by the ladder
    pub force_rate_limits: bool,

    /// Whether the host is vetoed for the remainder of the run
    pub stop_crawl_on_this_domain: bool,
}

impl HostErrorState {
    /// Creates a state for a host that has not failed yet
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            number_of_errors: 0,
            current_rate_limit_index: None,
            force_rate_limits: false,
            stop_crawl_on_this_domain: false,
        }
    }

    /// Records one retryable error and escalates when the threshold is reached
    ///
    /// `max_errors` of `None` disables escalation entirely.
    pub fn record_error(&mut self, max_errors: Option<u32>, ladder_len: usize) -> Escalation {
        if self.stop_crawl_on_this_domain {
            return Escalation::Stopped;
        }

        self.number_of_errors += 1;

        let threshold = match max_errors {
            Some(max) if max > 0 => max,
            _ => return Escalation::None,
        };

        if self.number_of_errors < threshold {
            return Escalation::None;
        }

        let next = self.current_rate_limit_index.map_or(0, |i| i + 1);
        if next < ladder_len {
            self.current_rate_limit_index = Some(next);
            self.number_of_errors = 0;
            self.force_rate_limits = true;
            Escalation::RateLimited(next)
        } else {
            self.stop_crawl_on_this_domain = true;
            Escalation::Stopped
        }
    }

    /// Delay imposed by the ladder, if the host is rate limited
    pub fn current_delay(&self, ladder: &[u64]) -> Option<Duration> {
        if !self.force_rate_limits {
            return None;
        }
        self.current_rate_limit_index
            .and_then(|i| ladder.get(i))
            .map(|ms| Duration::from_millis(*ms))
    }

    /// Returns true if the host should still be crawled
    pub fn is_crawlable(&self) -> bool {
        !self.stop_crawl_on_this_domain
    }
}
