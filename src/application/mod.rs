//! Application services: option resolution, rendering and the diagram entry point.

pub mod diagrams;
pub mod error;
pub mod options;
pub mod render;
pub mod source;

pub use diagrams::{Diagram, Diagrams};
pub use source::load_spec_file;
