//! Errores del motor de overrides.
//!
//! Cada variante corresponde a una categoría fatal: cualquiera de ellas aborta
//! la carga (o re-inicialización / duplicación) del pipeline que la originó.
//! Los mensajes llevan el contexto suficiente (setting, controller, stage,
//! parámetro) para localizar la entrada de configuración culpable.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::model::StageAddress;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("not a supported config file type (.properties, .yaml, .yml): {path} (extension {extension:?})")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("unsupported config source reference: {0}")]
    UnsupportedSource(String),

    #[error("missing field `{field}` for {context}")]
    MissingField { field: &'static str, context: String },

    #[error("type mismatch for {context}: expected {expected}, got {found}")]
    TypeMismatch { context: String, expected: &'static str, found: Value },

    #[error("setting does not start with a known prefix: {0}")]
    UnrecognizedKey(String),

    #[error("malformed config record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("could not read config file, not a list of settings: {0}")]
    NotARecordList(PathBuf),

    #[error("no stage `{}` in controller `{}` (override cannot be resolved)", .0.stage, .0.controller)]
    DanglingReference(StageAddress),

    #[error("stage name `{stage}` appears twice in controller `{controller}`")]
    DuplicateStageName { controller: String, stage: String },

    #[error("could not set parameter `{parameter}` of stage `{stage}` in controller `{controller}` to {value}: {reason}")]
    ParameterRejected { controller: String, stage: String, parameter: String, value: Value, reason: String },

    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("could not parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("could not load pipeline {url}: {reason}")]
    Load { url: String, reason: String },
}

/// Error devuelto por un stage del host al rechazar un valor de parámetro.
/// El applier lo envuelve en `OverlayError::ParameterRejected` con el contexto completo.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParameterRejection(pub String);
