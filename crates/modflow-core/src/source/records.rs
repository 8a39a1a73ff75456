//! Formato B: lista YAML de registros discriminados por `set`.
//!
//! ```yaml
//! - set: prparm      # controller, prname, name, value
//! - set: prinit      # controller, prname, name, value
//! - set: prrun       # controller, prname, value: true|false
//! - set: docfeature  # name, value
//! - set: propset     # name, value
//! ```
//! Un registro sin `set`, o que no es un mapa, se ignora con un warning (o
//! falla con `MalformedRecord` si el contexto es estricto). Un discriminador
//! desconocido se ignora sin warning. Campos requeridos ausentes y un `value`
//! no booleano en `prrun` son errores fatales.
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::constants::RECORD_DISCRIMINATOR;
use crate::errors::OverlayError;
use crate::model::{OverrideSet, StageAddress};
use crate::settings::ConfigContext;

pub fn parse_records(text: &str, origin: &Path, ctx: &ConfigContext) -> Result<OverrideSet, OverlayError> {
    if text.trim().is_empty() {
        return Ok(OverrideSet::new());
    }
    let doc: YamlValue = serde_yaml::from_str(text).map_err(|e| OverlayError::Parse { path: origin.to_path_buf(),
                                                                                      reason: e.to_string() })?;
    let records = match doc {
        YamlValue::Null => return Ok(OverrideSet::new()),
        YamlValue::Sequence(records) => records,
        _ => return Err(OverlayError::NotARecordList(origin.to_path_buf())),
    };

    let mut set = OverrideSet::new();
    for (index, item) in records.iter().enumerate() {
        let Some(map) = item.as_mapping() else {
            lenient(ctx, index, format!("config element not a map, ignoring: {item:?}"))?;
            continue;
        };
        let record = Record { index, map, origin };
        let kind = match map.get(RECORD_DISCRIMINATOR) {
            None | Some(YamlValue::Null) => {
                lenient(ctx, index, format!("no '{RECORD_DISCRIMINATOR}' key in setting, ignored: {map:?}"))?;
                continue;
            }
            Some(YamlValue::String(kind)) => kind.as_str(),
            Some(other) => {
                lenient(ctx, index, format!("'{RECORD_DISCRIMINATOR}' is not a string, ignored: {other:?}"))?;
                continue;
            }
        };
        match kind {
            "prparm" | "prinit" => {
                let controller = record.required_text("controller", kind)?;
                let prname = record.required_text("prname", kind)?;
                let name = record.required_text("name", kind)?;
                let value = record.value("value")?.unwrap_or(Value::Null);
                let address = StageAddress::new(controller, prname);
                if kind == "prparm" {
                    set.set_runtime_param(address, name, value);
                } else {
                    set.set_init_param(address, name, value);
                }
            }
            "prrun" => {
                let controller = record.required_text("controller", kind)?;
                let prname = record.required_text("prname", kind)?;
                match record.value("value")? {
                    Some(Value::Bool(flag)) => set.set_run_flag(StageAddress::new(controller, prname), flag),
                    other => {
                        return Err(OverlayError::TypeMismatch { context: record.describe(kind),
                                                                expected: "boolean",
                                                                found: other.unwrap_or(Value::Null) })
                    }
                }
            }
            "docfeature" => {
                let name = record.required_text("name", kind)?;
                let value = record.required_value("value", kind)?;
                set.set_document_feature(name, value);
            }
            "propset" => {
                let name = record.required_text("name", kind)?;
                let value = match record.required_value("value", kind)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                debug!("propset {name}={value}");
                ctx.set(name.clone(), value.clone());
                set.record_global_setting(name, value);
            }
            other => debug!("config record #{index}: ignoring unknown setting kind '{other}'"),
        }
    }
    Ok(set)
}

fn lenient(ctx: &ConfigContext, index: usize, reason: String) -> Result<(), OverlayError> {
    if ctx.strict_records() {
        return Err(OverlayError::MalformedRecord { index, reason });
    }
    warn!("config record #{index}: {reason}");
    Ok(())
}

struct Record<'a> {
    index: usize,
    map: &'a Mapping,
    origin: &'a Path,
}

impl Record<'_> {
    fn describe(&self, kind: &str) -> String {
        format!("config record #{} ({kind})", self.index)
    }

    /// Valor de un campo convertido a JSON; `None` si falta o es null.
    fn value(&self, field: &str) -> Result<Option<Value>, OverlayError> {
        match self.map.get(field) {
            None | Some(YamlValue::Null) => Ok(None),
            Some(v) => serde_json::to_value(v).map(Some)
                                             .map_err(|e| OverlayError::Parse { path: self.origin.to_path_buf(),
                                                                                reason: format!("record #{} field `{field}`: {e}", self.index) }),
        }
    }

    fn required_value(&self, field: &'static str, kind: &str) -> Result<Value, OverlayError> {
        self.value(field)?
            .ok_or_else(|| OverlayError::MissingField { field, context: self.describe(kind) })
    }

    /// Campo de texto requerido; escalares no-string se aceptan por su representación.
    fn required_text(&self, field: &'static str, kind: &str) -> Result<String, OverlayError> {
        match self.required_value(field, kind)? {
            Value::String(s) => Ok(s),
            v @ (Value::Bool(_) | Value::Number(_)) => Ok(v.to_string()),
            other => Err(OverlayError::TypeMismatch { context: format!("{} field `{field}`", self.describe(kind)),
                                                      expected: "string",
                                                      found: other }),
        }
    }
}
