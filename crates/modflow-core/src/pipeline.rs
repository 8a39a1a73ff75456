//! Eventos de carga de pipelines y el wrapper `SubPipeline`.
//!
//! Cada evento de carga (carga inicial, `reinit`, `duplicate`) parsea su
//! propio `OverrideSet` y lo aplica en dos fases:
//! 1. antes de construir: merge de `init_params` sobre los parámetros de construcción;
//! 2. después de construir: overrides de runtime y run flags sobre el grafo,
//!    incluidos los sub-pipelines anidados.
//!
//! `duplicate` copia el grafo vivo en lugar de construirlo, así que sólo
//! ejecuta la fase 2.
use std::sync::Arc;

use log::debug;
use serde_json::Value;
use uuid::Uuid;

use crate::apply::{apply_document_features, apply_runtime_params_nested};
use crate::errors::{OverlayError, ParameterRejection};
use crate::host::{ControllerHandle, DocumentHandle, StageHandle};
use crate::injection::merge_init_params;
use crate::model::{InitParams, OverrideSet, StageAddress};
use crate::settings::ConfigContext;
use crate::source::load_overrides;

/// Capa de persistencia: convierte una definición guardada en un grafo vivo.
pub trait PipelineLoader: Send + Sync {
    fn load(&self, url: &str, init_params: &InitParams) -> Result<Box<dyn ControllerHandle>, OverlayError>;

    /// Copia independiente del grafo vivo para ejecución paralela. Conserva el
    /// estado actual de los stages; no vuelve a leer la definición.
    fn duplicate(&self, controller: &dyn ControllerHandle) -> Result<Box<dyn ControllerHandle>, OverlayError> {
        controller.duplicate_graph()
                  .ok_or_else(|| OverlayError::Load { url: controller.name().to_string(),
                                                      reason: "controller cannot be duplicated".into() })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadRequest {
    /// URL de la definición del pipeline.
    pub url: String,
    /// Fuente de configuración asociada al pipeline (ruta o `file://`).
    pub config_source: Option<String>,
    /// Parámetros de construcción guardados en la definición.
    pub init_params: InitParams,
}

impl LoadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    pub fn with_config_source(mut self, source: impl Into<String>) -> Self {
        self.config_source = Some(source.into());
        self
    }

    pub fn with_init_param(mut self, address: StageAddress, name: impl Into<String>, value: Value) -> Self {
        self.init_params.entry(address).or_default().insert(name.into(), value);
        self
    }
}

pub struct LoadedPipeline {
    pub controller: Box<dyn ControllerHandle>,
    pub overrides: OverrideSet,
}

impl std::fmt::Debug for LoadedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPipeline")
         .field("controller", &self.controller.name())
         .field("overrides", &self.overrides)
         .finish()
    }
}

/// Evento de carga completo.
pub fn load_pipeline(loader: &dyn PipelineLoader, request: &LoadRequest, ctx: &ConfigContext) -> Result<LoadedPipeline, OverlayError> {
    build(request, ctx, |init| loader.load(&request.url, init))
}

/// Evento de carga sobre una copia de `source`: el grafo se duplica con
/// `PipelineLoader::duplicate` (sin fase init-time, ya está construido) y
/// recibe un `OverrideSet` recién parseado.
pub fn duplicate_pipeline(loader: &dyn PipelineLoader,
                          source: &dyn ControllerHandle,
                          request: &LoadRequest,
                          ctx: &ConfigContext)
                          -> Result<LoadedPipeline, OverlayError> {
    build(request, ctx, |_| loader.duplicate(source))
}

fn build<F>(request: &LoadRequest, ctx: &ConfigContext, construct: F) -> Result<LoadedPipeline, OverlayError>
    where F: FnOnce(&InitParams) -> Result<Box<dyn ControllerHandle>, OverlayError>
{
    let overrides = load_overrides(request.config_source.as_deref(), ctx)?;
    let init_params = merge_init_params(&request.init_params, Some(&overrides));
    let mut controller = construct(&init_params)?;
    let applied = apply_runtime_params_nested(controller.as_mut(), &overrides)?;
    debug!("loaded pipeline {} as `{}`: {applied} runtime overrides applied (fingerprint {})",
           request.url,
           controller.name(),
           overrides.fingerprint());
    Ok(LoadedPipeline { controller, overrides })
}

/// Stage embebible que representa un pipeline cargado desde su definición.
///
/// Siempre refleja la versión actual de la definición: `reinit` descarta el
/// grafo y vuelve a cargarlo, con un `OverrideSet` nuevo.
pub struct SubPipeline {
    id: Uuid,
    name: String,
    request: LoadRequest,
    loader: Arc<dyn PipelineLoader>,
    ctx: Arc<ConfigContext>,
    loaded: Option<LoadedPipeline>,
}

impl SubPipeline {
    pub fn load(name: impl Into<String>,
                loader: Arc<dyn PipelineLoader>,
                request: LoadRequest,
                ctx: Arc<ConfigContext>)
                -> Result<Self, OverlayError> {
        let mut sub = Self { id: Uuid::new_v4(),
                             name: name.into(),
                             request,
                             loader,
                             ctx,
                             loaded: None };
        sub.reinit()?;
        Ok(sub)
    }

    /// Carga usando el contexto global del proceso.
    pub fn load_with_global_context(name: impl Into<String>, loader: Arc<dyn PipelineLoader>, request: LoadRequest) -> Result<Self, OverlayError> {
        Self::load(name, loader, request, ConfigContext::global())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    /// Descarta el grafo actual y ejecuta un evento de carga nuevo.
    pub fn reinit(&mut self) -> Result<(), OverlayError> {
        debug!("sub-pipeline {} ({}): (re-)initialising {}", self.name, self.id, self.request.url);
        self.loaded = None;
        self.loaded = Some(load_pipeline(self.loader.as_ref(), &self.request, &self.ctx)?);
        Ok(())
    }

    /// Redirige la fuente de configuración. Se usa en el siguiente `reinit`
    /// o `duplicate`; el grafo cargado no cambia hasta entonces.
    pub fn set_config_source(&mut self, source: Option<String>) {
        debug!("sub-pipeline {} ({}): config source set to {source:?}", self.name, self.id);
        self.request.config_source = source;
    }

    /// Copia independiente con su propio grafo y su propio `OverrideSet`. El
    /// grafo se copia del vivo; sin grafo cargado se hace una carga nueva.
    pub fn duplicate(&self) -> Result<SubPipeline, OverlayError> {
        let id = Uuid::new_v4();
        debug!("sub-pipeline {} ({}): duplicating as {id}", self.name, self.id);
        let loaded = match &self.loaded {
            Some(live) => duplicate_pipeline(self.loader.as_ref(), live.controller.as_ref(), &self.request, &self.ctx)?,
            None => load_pipeline(self.loader.as_ref(), &self.request, &self.ctx)?,
        };
        Ok(SubPipeline { id,
                         name: self.name.clone(),
                         request: self.request.clone(),
                         loader: Arc::clone(&self.loader),
                         ctx: Arc::clone(&self.ctx),
                         loaded: Some(loaded) })
    }

    pub fn controller(&self) -> Option<&dyn ControllerHandle> {
        match &self.loaded {
            Some(loaded) => {
                let controller: &dyn ControllerHandle = loaded.controller.as_ref();
                Some(controller)
            }
            None => None,
        }
    }

    pub fn overrides(&self) -> Option<&OverrideSet> {
        self.loaded.as_ref().map(|l| &l.overrides)
    }

    /// Pasa el corpus al controller si éste lo necesita.
    pub fn bind_corpus(&mut self, corpus: Option<&str>) {
        let Some(loaded) = self.loaded.as_mut() else { return };
        if let Some(aware) = loaded.controller.as_corpus_aware() {
            aware.set_corpus(corpus.map(str::to_string));
        }
    }

    /// Escribe los document features configurados sobre `document`.
    pub fn prepare_document(&self, document: &mut dyn DocumentHandle) {
        if let Some(loaded) = &self.loaded {
            apply_document_features(document, &loaded.overrides);
        }
    }

    /// Libera el grafo cargado.
    pub fn cleanup(&mut self) {
        debug!("sub-pipeline {} ({}): cleanup", self.name, self.id);
        self.loaded = None;
    }
}

impl std::fmt::Debug for SubPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubPipeline")
         .field("id", &self.id)
         .field("name", &self.name)
         .field("request", &self.request)
         .field("loaded", &self.loaded)
         .finish()
    }
}

impl StageHandle for SubPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set_parameter(&mut self, name: &str, _value: &Value) -> Result<(), ParameterRejection> {
        Err(ParameterRejection(format!("sub-pipeline stages have no runtime parameter `{name}`")))
    }

    fn nested_controller(&mut self) -> Option<&mut dyn ControllerHandle> {
        match &mut self.loaded {
            Some(loaded) => {
                let controller: &mut dyn ControllerHandle = loaded.controller.as_mut();
                Some(controller)
            }
            None => None,
        }
    }
}
