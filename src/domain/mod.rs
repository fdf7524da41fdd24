//! Diagram domain: option records, theme catalogs and rendered artifacts.

pub mod artifact;
pub mod error;
pub mod options;
pub mod themes;
