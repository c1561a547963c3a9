//! Core types for Duologue.

pub mod message;

pub use message::*;
