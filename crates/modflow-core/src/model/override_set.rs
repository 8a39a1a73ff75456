//! `OverrideSet`: resultado normalizado de parsear una fuente de configuración.
//!
//! Se crea nuevo en cada evento de carga de un pipeline (carga inicial,
//! re-inicialización, duplicación) y el applier lo consume sin modificarlo.
//! No guarda referencias al grafo de stages vivo.
//!
//! Todos los mapas conservan el orden de inserción del parseo; cuando un
//! parámetro se repite gana el último valor parseado, manteniendo su posición.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::StageAddress;
use crate::constants::OVERLAY_FORMAT_VERSION;
use crate::hashing::{hash_str, to_canonical_json};

/// Mapa ordenado nombre-de-parámetro -> valor.
pub type ParamMap = Map<String, Value>;

/// Parámetros de construcción por stage.
pub type InitParams = IndexMap<StageAddress, ParamMap>;

/// Modo de ejecución condicional de un stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Always,
    Never,
}

impl From<bool> for RunMode {
    fn from(flag: bool) -> Self {
        if flag {
            RunMode::Always
        } else {
            RunMode::Never
        }
    }
}

/// Overrides de runtime para un stage concreto. El run flag es un campo
/// explícito, independiente de los parámetros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOverride {
    pub parameters: ParamMap,
    pub run_flag: Option<bool>,
}

impl StageOverride {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.run_flag.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    pub document_features: ParamMap,
    pub init_params: InitParams,
    pub runtime_params: IndexMap<StageAddress, StageOverride>,
    /// Settings globales escritos por esta fuente (ya aplicados al `ConfigContext`).
    pub global_settings: IndexMap<String, String>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.document_features.is_empty()
        && self.init_params.is_empty()
        && self.runtime_params.is_empty()
        && self.global_settings.is_empty()
    }

    pub fn set_document_feature(&mut self, name: impl Into<String>, value: Value) {
        self.document_features.insert(name.into(), value);
    }

    /// Acumula un parámetro de runtime bajo `address`. Varias entradas para la
    /// misma dirección se fusionan en un único mapa.
    pub fn set_runtime_param(&mut self, address: StageAddress, name: impl Into<String>, value: Value) {
        self.runtime_params
            .entry(address)
            .or_default()
            .parameters
            .insert(name.into(), value);
    }

    pub fn set_run_flag(&mut self, address: StageAddress, flag: bool) {
        self.runtime_params.entry(address).or_default().run_flag = Some(flag);
    }

    pub fn set_init_param(&mut self, address: StageAddress, name: impl Into<String>, value: Value) {
        self.init_params.entry(address).or_default().insert(name.into(), value);
    }

    pub fn record_global_setting(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.global_settings.insert(key.into(), value.into());
    }

    /// Overrides de runtime dirigidos al controller `name`, en orden de parseo.
    pub fn runtime_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a StageAddress, &'a StageOverride)> + 'a {
        self.runtime_params.iter().filter(move |(addr, _)| addr.belongs_to(name))
    }

    /// Representación JSON anidada `controller -> stage -> override`. No usa
    /// claves compuestas, así que nombres con cualquier carácter son seguros.
    pub fn to_json(&self) -> Value {
        json!({
            "document_features": Value::Object(self.document_features.clone()),
            "init_params": nest(self.init_params.iter().map(|(a, p)| (a, Value::Object(p.clone())))),
            "runtime_params": nest(self.runtime_params.iter().map(|(a, o)| (a, stage_override_json(o)))),
            "global_settings": self.global_settings,
        })
    }

    /// Fingerprint estable del set: independiente del orden de claves de la fuente.
    pub fn fingerprint(&self) -> String {
        let input = json!({
            "format_version": OVERLAY_FORMAT_VERSION,
            "overrides": self.to_json(),
        });
        hash_str(&to_canonical_json(&input))
    }
}

fn stage_override_json(ov: &StageOverride) -> Value {
    let mut out = Map::new();
    out.insert("parameters".into(), Value::Object(ov.parameters.clone()));
    if let Some(flag) = ov.run_flag {
        out.insert("run_flag".into(), Value::Bool(flag));
    }
    Value::Object(out)
}

fn nest<'a>(entries: impl Iterator<Item = (&'a StageAddress, Value)>) -> Value {
    let mut by_controller: Map<String, Value> = Map::new();
    for (addr, value) in entries {
        let slot = by_controller.entry(addr.controller.clone())
                                .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(stages) = slot {
            stages.insert(addr.stage.clone(), value);
        }
    }
    Value::Object(by_controller)
}
