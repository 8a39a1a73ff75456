//! Merge determinista de parámetros de construcción.
//!
//! Merge "shallow" por stage: las claves del override reemplazan a las
//! existentes; valores objeto no se fusionan recursivamente.

use crate::model::{InitParams, OverrideSet, ParamMap, StageAddress};

fn merge_maps(base: &ParamMap, top: &ParamMap) -> ParamMap {
    let mut out = base.clone();
    for (k, v) in top.iter() {
        out.insert(k.clone(), v.clone());
    }
    out
}

/// Fusiona los `init_params` de `overrides` sobre `existing`. Sin set el
/// resultado es una copia de `existing`.
pub fn merge_init_params(existing: &InitParams, overrides: Option<&OverrideSet>) -> InitParams {
    let mut out = existing.clone();
    let Some(overrides) = overrides else { return out };
    for address in overrides.init_params.keys() {
        let current = out.get(address).cloned().unwrap_or_default();
        out.insert(address.clone(), merge_stage_init_params(address, &current, Some(overrides)));
    }
    out
}

/// Variante por stage: parámetros de construcción de `address` con los overrides aplicados.
pub fn merge_stage_init_params(address: &StageAddress, existing: &ParamMap, overrides: Option<&OverrideSet>) -> ParamMap {
    match overrides.and_then(|o| o.init_params.get(address)) {
        Some(params) => merge_maps(existing, params),
        None => existing.clone(),
    }
}
