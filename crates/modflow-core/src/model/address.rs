//! Dirección de un stage dentro del grafo de pipelines.
//!
//! Un stage se identifica por el par `(controller, stage)`. Es un tipo valor
//! con igualdad estructural: dos direcciones son iguales si y sólo si ambos
//! nombres coinciden, sin depender de separadores dentro de los nombres.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageAddress {
    pub controller: String,
    pub stage: String,
}

impl StageAddress {
    pub fn new(controller: impl Into<String>, stage: impl Into<String>) -> Self {
        Self { controller: controller.into(),
               stage: stage.into() }
    }

    /// `true` si la dirección apunta a un stage del controller `name`.
    pub fn belongs_to(&self, name: &str) -> bool {
        self.controller == name
    }
}

impl fmt::Display for StageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.controller, self.stage)
    }
}
