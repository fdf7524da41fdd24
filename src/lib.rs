//! Content-addressed, two-tier memoization cache for D2 diagram rendering.
//!
//! A [`Diagrams`](application::Diagrams) session resolves call-site options
//! over site configuration and built-in defaults, derives a [`CacheKey`]
//! from the diagram source and the resolved options, and serves the rendered
//! SVG from memory, from the persistent store, or by invoking the d2 CLI at
//! most once per key.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

pub use application::{Diagram, Diagrams, error::DiagramError};
pub use cache::{CacheKey, DiagramCache};
