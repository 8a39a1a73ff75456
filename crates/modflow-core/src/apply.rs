//! Aplicación de overrides de runtime sobre controllers ya instanciados.
//!
//! Política por controller:
//! 1. Resolución todo-o-nada: se indexan los stages por nombre (un nombre
//!    repetido es fatal) y se resuelven todas las direcciones dirigidas a
//!    este controller (una dirección colgante es fatal). Si algo falla no se
//!    escribe ningún valor.
//! 2. Aplicación en orden de parseo: el primer `ParameterRejected` aborta el
//!    resto; los valores ya escritos quedan escritos (el host no ofrece rollback).
//!
//! Sobre un grafo completo (`apply_runtime_params_nested`) una dirección cuyo
//! controller no aparece en ningún nivel también es colgante, y se detecta
//! antes de escribir nada.
//!
//! Todo el estado auxiliar es local a cada invocación, por lo que puede
//! llamarse en paralelo sobre controllers distintos.
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::errors::OverlayError;
use crate::host::{ControllerHandle, DocumentHandle};
use crate::model::{OverrideSet, RunMode, StageAddress, StageOverride};

/// Aplica los overrides dirigidos a `controller`. Devuelve cuántos valores
/// (parámetros + run flags) se escribieron.
///
/// Con un set vacío (sin configuración) no se valida nada; con cualquier
/// configuración los nombres de stage deben ser únicos aunque ningún
/// override apunte a este controller.
pub fn apply_runtime_params(controller: &mut dyn ControllerHandle, overrides: &OverrideSet) -> Result<usize, OverlayError> {
    if overrides.is_empty() {
        return Ok(0);
    }
    let name = controller.name().to_string();
    let index = index_stages(&*controller)?;

    let mut resolved: Vec<(usize, &StageAddress, &StageOverride)> = Vec::new();
    for (address, ov) in overrides.runtime_for(&name) {
        let position = index.get(address.stage.as_str())
                            .copied()
                            .ok_or_else(|| OverlayError::DanglingReference(address.clone()))?;
        resolved.push((position, address, ov));
    }
    if resolved.is_empty() {
        return Ok(0);
    }

    let mut applied = 0;
    for (position, address, ov) in resolved {
        let stage = controller.stage_mut(position)
                              .ok_or_else(|| OverlayError::DanglingReference(address.clone()))?;
        for (parameter, value) in ov.parameters.iter() {
            debug!("setting {parameter}={value} on {address}");
            stage.set_parameter(parameter, value)
                 .map_err(|rejection| OverlayError::ParameterRejected { controller: name.clone(),
                                                                        stage: address.stage.clone(),
                                                                        parameter: parameter.clone(),
                                                                        value: value.clone(),
                                                                        reason: rejection.0 })?;
            applied += 1;
        }
        if let Some(flag) = ov.run_flag {
            match controller.as_conditional() {
                Some(conditional) => {
                    debug!("setting run mode of {address} to {:?}", RunMode::from(flag));
                    conditional.set_run_mode(position, RunMode::from(flag));
                    applied += 1;
                }
                None => debug!("controller `{name}` has no conditional execution, run flag for {address} ignored"),
            }
        }
    }
    Ok(applied)
}

/// Aplica sobre `controller` y luego, en profundidad y en orden de stages,
/// sobre cada sub-pipeline embebido.
///
/// Antes de escribir, cada dirección de runtime debe nombrar un controller
/// presente en algún nivel del grafo; si no, `DanglingReference`.
pub fn apply_runtime_params_nested(controller: &mut dyn ControllerHandle, overrides: &OverrideSet) -> Result<usize, OverlayError> {
    if !overrides.runtime_params.is_empty() {
        let mut names = HashSet::new();
        collect_controller_names(controller, &mut names);
        if let Some(address) = overrides.runtime_params.keys().find(|a| !names.contains(a.controller.as_str())) {
            return Err(OverlayError::DanglingReference(address.clone()));
        }
    }
    apply_in_depth(controller, overrides)
}

fn apply_in_depth(controller: &mut dyn ControllerHandle, overrides: &OverrideSet) -> Result<usize, OverlayError> {
    let mut applied = apply_runtime_params(controller, overrides)?;
    for position in 0..controller.stage_count() {
        let nested = controller.stage_mut(position).and_then(|stage| stage.nested_controller());
        if let Some(nested) = nested {
            applied += apply_in_depth(nested, overrides)?;
        }
    }
    Ok(applied)
}

fn collect_controller_names(controller: &mut dyn ControllerHandle, names: &mut HashSet<String>) {
    names.insert(controller.name().to_string());
    for position in 0..controller.stage_count() {
        let nested = controller.stage_mut(position).and_then(|stage| stage.nested_controller());
        if let Some(nested) = nested {
            collect_controller_names(nested, names);
        }
    }
}

/// Escribe los `document_features` del set sobre un documento.
pub fn apply_document_features(document: &mut dyn DocumentHandle, overrides: &OverrideSet) {
    for (name, value) in overrides.document_features.iter() {
        document.set_feature(name, value.clone());
    }
}

fn index_stages(controller: &dyn ControllerHandle) -> Result<HashMap<String, usize>, OverlayError> {
    let mut index = HashMap::with_capacity(controller.stage_count());
    for position in 0..controller.stage_count() {
        let Some(stage) = controller.stage(position) else { continue };
        if index.insert(stage.name().to_string(), position).is_some() {
            return Err(OverlayError::DuplicateStageName { controller: controller.name().to_string(),
                                                          stage: stage.name().to_string() });
        }
    }
    Ok(index)
}
