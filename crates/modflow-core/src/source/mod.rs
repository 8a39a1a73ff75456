//! Fuentes de configuración: resolución, selección de formato y parseo.
//!
//! Dos formatos, elegidos por extensión:
//! - `.properties`: clave-valor plano (ver `properties`).
//! - `.yaml` / `.yml`: lista de registros (ver `records`).
//!
//! Cualquier otra extensión falla con `UnsupportedFormat`. La lectura del
//! archivo es un único read bloqueante por parseo.

pub mod properties;
pub mod records;

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::{PROPERTIES_EXTENSION, RECORD_EXTENSIONS};
use crate::errors::OverlayError;
use crate::model::OverrideSet;
use crate::settings::ConfigContext;

pub use properties::{parse_properties, read_properties};
pub use records::parse_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Formato A: clave-valor.
    Properties,
    /// Formato B: lista de registros.
    Records,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, OverlayError> {
        let extension = path.extension()
                            .and_then(|e| e.to_str())
                            .unwrap_or_default()
                            .to_string();
        if extension == PROPERTIES_EXTENSION {
            Ok(SourceFormat::Properties)
        } else if RECORD_EXTENSIONS.contains(&extension.as_str()) {
            Ok(SourceFormat::Records)
        } else {
            Err(OverlayError::UnsupportedFormat { path: path.to_path_buf(), extension })
        }
    }
}

/// Convierte una referencia (ruta o URL `file://`) en una ruta local. En las
/// URLs el path se decodifica (`%20` -> espacio, UTF-8 en `%XX`).
pub fn source_path(reference: &str) -> Result<PathBuf, OverlayError> {
    if let Some(rest) = reference.strip_prefix("file://") {
        // file:///abs/path o file://localhost/abs/path
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        if rest.starts_with('/') {
            return percent_decode(rest).map(PathBuf::from)
                                       .ok_or_else(|| OverlayError::UnsupportedSource(reference.to_string()));
        }
        return Err(OverlayError::UnsupportedSource(reference.to_string()));
    }
    match reference.split_once("://") {
        Some(_) => Err(OverlayError::UnsupportedSource(reference.to_string())),
        None => Ok(PathBuf::from(reference)),
    }
}

/// `None` si hay un escape mal formado o el resultado no es UTF-8.
fn percent_decode(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).filter(|h| h.iter().all(u8::is_ascii_hexdigit))?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Elige la fuente efectiva para una carga: el override del contexto tiene
/// precedencia sobre la referencia que trae el pipeline.
pub fn resolve_source(pipeline_source: Option<&str>, ctx: &ConfigContext) -> Result<Option<PathBuf>, OverlayError> {
    if let Some(path) = ctx.config_file_override() {
        debug!("config source overridden by context: {}", path.display());
        return Ok(Some(path));
    }
    pipeline_source.map(source_path).transpose()
}

/// Lee y parsea una fuente. No devuelve sets parciales: ante cualquier error
/// fatal el resultado es `Err`.
pub fn parse_source(path: &Path, ctx: &ConfigContext) -> Result<OverrideSet, OverlayError> {
    let format = SourceFormat::from_path(path)?;
    debug!("reading config from {} ({:?})", path.display(), format);
    let text = fs::read_to_string(path).map_err(|source| OverlayError::Io { path: path.to_path_buf(), source })?;
    match format {
        SourceFormat::Properties => parse_properties(&text, ctx),
        SourceFormat::Records => parse_records(&text, path, ctx),
    }
}

/// Parsea con el contexto global del proceso.
pub fn parse(path: &Path) -> Result<OverrideSet, OverlayError> {
    parse_source(path, &ConfigContext::global())
}

/// Resuelve y parsea la fuente de una carga. Sin fuente el resultado es un set vacío.
pub fn load_overrides(pipeline_source: Option<&str>, ctx: &ConfigContext) -> Result<OverrideSet, OverlayError> {
    match resolve_source(pipeline_source, ctx)? {
        Some(path) => parse_source(&path, ctx),
        None => Ok(OverrideSet::new()),
    }
}
