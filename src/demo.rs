//! Grafo de ejemplo: un pipeline `main` que embebe el sub-pipeline `annie`.
//!
//! Usado por el binario `main-core` y por los tests de integración del crate raíz.
use std::fs;
use std::path::{Path, PathBuf};

use modflow_core::{InMemoryController, InMemoryLoader, InMemoryStage, ParamKind};

use crate::errors::AppError;

pub const MAIN_URL: &str = "mem://main";

/// Sub-pipeline de anotación, mantenido aparte del pipeline principal.
pub fn annie() -> InMemoryController {
    InMemoryController::conditional("annie").with_stage(InMemoryStage::new("tokeniser"))
                                            .with_stage(InMemoryStage::new("gazetteer").with_schema("listsURL", ParamKind::String)
                                                                                       .with_schema("caseSensitive", ParamKind::Boolean))
                                            .with_stage(InMemoryStage::new("ner").with_schema("threshold", ParamKind::Number))
}

pub fn main_pipeline() -> InMemoryController {
    InMemoryController::conditional("main").corpus_aware()
                                           .with_stage(InMemoryStage::new("reader"))
                                           .with_stage(InMemoryStage::new("annie-pr").with_nested(annie()))
                                           .with_stage(InMemoryStage::new("writer"))
}

pub fn loader() -> InMemoryLoader {
    InMemoryLoader::new().with_definition(MAIN_URL, main_pipeline())
}

/// Configuración de ejemplo en formato de registros.
pub const DEMO_CONFIG: &str = "\
- set: docfeature
  name: source
  value: demo
- set: prparm
  controller: annie
  prname: ner
  name: threshold
  value: 0.75
- set: prrun
  controller: annie
  prname: gazetteer
  value: false
- set: prparm
  controller: main
  prname: writer
  name: format
  value: json
";

/// Escribe `DEMO_CONFIG` en `dir` y devuelve la ruta.
pub fn write_demo_config(dir: &Path) -> Result<PathBuf, AppError> {
    let path = dir.join("demo.yaml");
    fs::write(&path, DEMO_CONFIG)?;
    Ok(path)
}
