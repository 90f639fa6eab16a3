//! Utility modules for common functionality

pub mod signals;

pub use signals::ShutdownSignals;

// vim: ts=4
