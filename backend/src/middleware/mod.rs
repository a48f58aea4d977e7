//! Request middleware.
//!
//! Purpose: attach a correlation identifier to every request so logs, error
//! envelopes and response headers line up.

pub mod trace;

pub use trace::Trace;
