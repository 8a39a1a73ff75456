//! Host en memoria: controllers, stages, documentos y loader.
//!
//! Implementación mínima de los contratos de `host` y `pipeline` para
//! pruebas, la demo y la CLI (que lee grafos descritos en JSON).
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{OverlayError, ParameterRejection};
use crate::host::{ConditionalExecutionCapable, ControllerHandle, CorpusAware, DocumentHandle, StageHandle};
use crate::model::{InitParams, ParamMap, RunMode, StageAddress};
use crate::pipeline::PipelineLoader;

/// Tipo declarado de un parámetro de stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Boolean,
    Number,
    Any,
}

impl ParamKind {
    /// Convierte `value` al tipo declarado. Strings numéricos/booleanos se
    /// aceptan, como llegan desde el formato de propiedades.
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamKind::Any, v) => Some(v.clone()),
            (ParamKind::String, Value::String(_)) => Some(value.clone()),
            (ParamKind::String, Value::Number(_) | Value::Bool(_)) => Some(Value::String(value.to_string())),
            (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamKind::Boolean, Value::String(s)) => s.trim().parse::<bool>().ok().map(Value::Bool),
            (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
            (ParamKind::Number, Value::String(s)) => s.trim().parse::<serde_json::Number>().ok().map(Value::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryStage {
    pub name: String,
    #[serde(default)]
    pub params: ParamMap,
    /// Parámetros aceptados; `None` acepta cualquiera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<IndexMap<String, ParamKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<InMemoryController>>,
}

impl InMemoryStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_schema(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.schema.get_or_insert_with(IndexMap::new).insert(name.into(), kind);
        self
    }

    pub fn with_nested(mut self, controller: InMemoryController) -> Self {
        self.nested = Some(Box::new(controller));
        self
    }
}

impl StageHandle for InMemoryStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter(&self, name: &str) -> Option<Value> {
        self.params.get(name).cloned()
    }

    fn set_parameter(&mut self, name: &str, value: &Value) -> Result<(), ParameterRejection> {
        let stored = match &self.schema {
            None => value.clone(),
            Some(schema) => {
                let kind = schema.get(name)
                                 .ok_or_else(|| ParameterRejection(format!("unknown parameter `{name}`")))?;
                kind.coerce(value)
                    .ok_or_else(|| ParameterRejection(format!("expected {kind:?} value")))?
            }
        };
        self.params.insert(name.to_string(), stored);
        Ok(())
    }

    fn nested_controller(&mut self) -> Option<&mut dyn ControllerHandle> {
        self.nested.as_deref_mut().map(|c| c as &mut dyn ControllerHandle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryController {
    pub name: String,
    #[serde(default)]
    pub stages: Vec<InMemoryStage>,
    /// Soporta ejecución condicional por stage.
    #[serde(default)]
    pub conditional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_modes: Vec<RunMode>,
    #[serde(default)]
    pub corpus_aware: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus: Option<String>,
}

impl InMemoryController {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn conditional(name: impl Into<String>) -> Self {
        Self { conditional: true, ..Self::new(name) }
    }

    pub fn with_stage(mut self, stage: InMemoryStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn corpus_aware(mut self) -> Self {
        self.corpus_aware = true;
        self
    }

    pub fn stage_by_name(&self, name: &str) -> Option<&InMemoryStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Modo efectivo de un stage; sin override explícito siempre corre.
    pub fn effective_run_mode(&self, stage_index: usize) -> RunMode {
        self.run_modes.get(stage_index).copied().unwrap_or(RunMode::Always)
    }

    /// Escribe parámetros de construcción sobre este controller y sus anidados.
    /// Devuelve cuántas direcciones se resolvieron.
    fn inject_init_params(&mut self, init_params: &InitParams) -> usize {
        let mut resolved = 0;
        for stage in self.stages.iter_mut() {
            let address = StageAddress::new(self.name.clone(), stage.name.clone());
            if let Some(params) = init_params.get(&address) {
                for (k, v) in params.iter() {
                    stage.params.insert(k.clone(), v.clone());
                }
                resolved += 1;
            }
            if let Some(nested) = stage.nested.as_deref_mut() {
                resolved += nested.inject_init_params(init_params);
            }
        }
        resolved
    }

    fn contains(&self, address: &StageAddress) -> bool {
        self.stages.iter().any(|s| {
            (self.name == address.controller && s.name == address.stage)
            || s.nested.as_deref().is_some_and(|n| n.contains(address))
        })
    }
}

impl ControllerHandle for InMemoryController {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn stage(&self, index: usize) -> Option<&dyn StageHandle> {
        self.stages.get(index).map(|s| s as &dyn StageHandle)
    }

    fn stage_mut(&mut self, index: usize) -> Option<&mut dyn StageHandle> {
        self.stages.get_mut(index).map(|s| s as &mut dyn StageHandle)
    }

    fn duplicate_graph(&self) -> Option<Box<dyn ControllerHandle>> {
        Some(Box::new(self.clone()))
    }

    fn as_conditional(&mut self) -> Option<&mut dyn ConditionalExecutionCapable> {
        if self.conditional {
            Some(self)
        } else {
            None
        }
    }

    fn as_corpus_aware(&mut self) -> Option<&mut dyn CorpusAware> {
        if self.corpus_aware {
            Some(self)
        } else {
            None
        }
    }
}

impl ConditionalExecutionCapable for InMemoryController {
    fn set_run_mode(&mut self, stage_index: usize, mode: RunMode) {
        if stage_index >= self.stages.len() {
            return;
        }
        if self.run_modes.len() < self.stages.len() {
            self.run_modes.resize(self.stages.len(), RunMode::Always);
        }
        self.run_modes[stage_index] = mode;
    }

    fn run_mode(&self, stage_index: usize) -> Option<RunMode> {
        (stage_index < self.stages.len()).then(|| self.effective_run_mode(stage_index))
    }
}

impl CorpusAware for InMemoryController {
    fn set_corpus(&mut self, corpus: Option<String>) {
        self.corpus = corpus;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryDocument {
    pub name: String,
    #[serde(default)]
    pub features: ParamMap,
}

impl DocumentHandle for InMemoryDocument {
    fn set_feature(&mut self, name: &str, value: Value) {
        self.features.insert(name.to_string(), value);
    }
}

/// Loader con definiciones de pipeline registradas por URL.
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    definitions: IndexMap<String, InMemoryController>,
    loads: AtomicUsize,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, url: impl Into<String>, controller: InMemoryController) -> Self {
        self.definitions.insert(url.into(), controller);
        self
    }

    /// Número de grafos construidos (cargas + duplicaciones).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Construye una copia concreta del grafo registrado en `url`.
    pub fn instantiate(&self, url: &str, init_params: &InitParams) -> Result<InMemoryController, OverlayError> {
        let mut controller = self.definitions
                                 .get(url)
                                 .cloned()
                                 .ok_or_else(|| OverlayError::Load { url: url.to_string(),
                                                                     reason: "no pipeline definition registered".into() })?;
        if let Some(missing) = init_params.keys().find(|a| !controller.contains(a)) {
            return Err(OverlayError::DanglingReference(missing.clone()));
        }
        controller.inject_init_params(init_params);
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(controller)
    }
}

impl PipelineLoader for InMemoryLoader {
    fn load(&self, url: &str, init_params: &InitParams) -> Result<Box<dyn ControllerHandle>, OverlayError> {
        Ok(Box::new(self.instantiate(url, init_params)?))
    }

    fn duplicate(&self, controller: &dyn ControllerHandle) -> Result<Box<dyn ControllerHandle>, OverlayError> {
        let copy = controller.duplicate_graph()
                             .ok_or_else(|| OverlayError::Load { url: controller.name().to_string(),
                                                                 reason: "controller cannot be duplicated".into() })?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(copy)
    }
}
