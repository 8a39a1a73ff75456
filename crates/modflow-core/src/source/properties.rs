//! Formato A: archivo de propiedades clave-valor.
//!
//! Gramática de claves:
//! ```text
//! docfeature.<name> = <value>
//! prparm.<settingId>.{controller,prname,name,value} = ...
//! prinit.<settingId>.{controller,prname,name,value} = ...
//! propset.<key> = <value>
//! ```
//! Las claves `prparm`/`prinit` se agrupan por `<settingId>`; cada grupo debe
//! tener los cuatro campos. Un prefijo desconocido es un error fatal.
//! Las claves se procesan en orden lexicográfico, así el resultado y el primer
//! error reportado no dependen del orden del archivo.
use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::constants::{DOCFEATURE_PREFIX, PRINIT_PREFIX, PRPARM_PREFIX, PROPSET_PREFIX, SETTING_FIELDS};
use crate::errors::OverlayError;
use crate::model::{OverrideSet, StageAddress};
use crate::settings::ConfigContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SettingKind {
    Runtime,
    Init,
}

impl SettingKind {
    fn describe(self) -> &'static str {
        match self {
            SettingKind::Runtime => "pr parameter setting",
            SettingKind::Init => "pr init parameter setting",
        }
    }
}

/// Setting agrupado por `<settingId>`, completo o no.
#[derive(Debug, Default)]
struct PendingSetting {
    fields: BTreeMap<&'static str, String>,
}

impl PendingSetting {
    fn require(&self, field: &'static str, kind: SettingKind, id: &str) -> Result<&str, OverlayError> {
        self.fields
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| OverlayError::MissingField { field,
                                                        context: format!("{} {id}", kind.describe()) })
    }
}

/// Parsea el texto de un archivo de propiedades a un `OverrideSet`.
/// Los `propset` se escriben en `ctx` al encontrarse.
pub fn parse_properties(text: &str, ctx: &ConfigContext) -> Result<OverrideSet, OverlayError> {
    let properties = read_properties(text);
    let mut keys: Vec<&String> = properties.keys().collect();
    keys.sort();

    let mut set = OverrideSet::new();
    let mut pending: BTreeMap<(SettingKind, String), PendingSetting> = BTreeMap::new();

    for key in keys {
        let value = &properties[key];
        if let Some(name) = key.strip_prefix(DOCFEATURE_PREFIX).filter(|n| !n.is_empty()) {
            set.set_document_feature(name, Value::String(value.clone()));
        } else if let Some(rest) = key.strip_prefix(PRPARM_PREFIX) {
            let (id, field) = split_setting_key(key, rest)?;
            pending.entry((SettingKind::Runtime, id)).or_default().fields.insert(field, value.clone());
        } else if let Some(rest) = key.strip_prefix(PRINIT_PREFIX) {
            let (id, field) = split_setting_key(key, rest)?;
            pending.entry((SettingKind::Init, id)).or_default().fields.insert(field, value.clone());
        } else if let Some(name) = key.strip_prefix(PROPSET_PREFIX).filter(|n| !n.is_empty()) {
            debug!("propset {name}={value}");
            ctx.set(name, value.clone());
            set.record_global_setting(name, value.clone());
        } else {
            return Err(OverlayError::UnrecognizedKey(key.clone()));
        }
    }

    for ((kind, id), setting) in pending.iter() {
        let prname = setting.require("prname", *kind, id)?;
        let name = setting.require("name", *kind, id)?;
        let value = setting.require("value", *kind, id)?;
        let controller = setting.require("controller", *kind, id)?;
        let address = StageAddress::new(controller, prname);
        let value = Value::String(value.to_string());
        match kind {
            SettingKind::Runtime => set.set_runtime_param(address, name, value),
            SettingKind::Init => set.set_init_param(address, name, value),
        }
    }
    Ok(set)
}

/// Separa `<settingId>.<field>`; el id puede contener puntos, el campo no.
fn split_setting_key(key: &str, rest: &str) -> Result<(String, &'static str), OverlayError> {
    let (id, field) = rest.rsplit_once('.')
                          .filter(|(id, _)| !id.is_empty())
                          .ok_or_else(|| OverlayError::UnrecognizedKey(key.to_string()))?;
    let field = SETTING_FIELDS.iter()
                              .find(|f| **f == field)
                              .ok_or_else(|| OverlayError::UnrecognizedKey(key.to_string()))?;
    Ok((id.to_string(), field))
}

/// Lector compatible con `java.util.Properties`: comentarios `#`/`!`,
/// separadores `=`, `:` o espacio, continuación con `\` al final de línea y
/// escapes `\t \n \r \f \uXXXX`. Claves repetidas: gana la última.
pub fn read_properties(text: &str) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let first = line.trim_start_matches([' ', '\t', '\u{c}']);
        if first.is_empty() || first.starts_with('#') || first.starts_with('!') {
            continue;
        }
        let mut logical = String::from(first);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches([' ', '\t', '\u{c}'])),
                None => break,
            }
        }
        let (key, value) = split_key_value(&logical);
        out.insert(unescape(key), unescape(value));
    }
    out
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if matches!(c, '=' | ':' | ' ' | '\t' | '\u{c}') {
            end = i;
            break;
        }
    }
    let key = &line[..end];
    let mut rest = line[end..].trim_start_matches([' ', '\t', '\u{c}']);
    if let Some(r) = rest.strip_prefix(['=', ':']) {
        rest = r.trim_start_matches([' ', '\t', '\u{c}']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
