//! State module for tracking per-host crawl health
//!
//! # Components
//!
//! - `HostErrorState`: consecutive-error counter and rate-ladder position of one host
//! - `Escalation`: the outcome of recording an error against that state

mod host_state;

pub use host_state::{Escalation, HostErrorState};
