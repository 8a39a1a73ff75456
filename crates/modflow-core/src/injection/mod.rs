//! Inyección de parámetros de construcción (init-time).
//!
//! La capa de persistencia llama a estas funciones justo antes de instanciar
//! el grafo de stages; los overrides del set tienen precedencia sobre los
//! valores guardados en la definición del pipeline.

pub mod merge;

pub use merge::{merge_init_params, merge_stage_init_params};
