//! Match Report: prose match reports from league history.
//!
//! Computes point-in-time standings and form over an ordered match log,
//! then assembles a report from author-supplied phrase templates chosen by
//! eligibility predicates, with per-match anti-repetition bookkeeping.

pub mod config;
pub mod core;
pub mod schema;
