//! Modflow Rust Library
//!
//! Fachada del workspace:
//! - Re-exporta `modflow-core` (parseo de fuentes, merge init-time, applier).
//! - Expone `errors` para los binarios y `demo` con el grafo de ejemplo.

pub mod demo;
pub mod errors;

pub use modflow_core::*;
