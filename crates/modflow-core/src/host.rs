//! Contratos que el motor consume del host (ejecución y persistencia).
//!
//! El applier sólo lee nombres del grafo y escribe valores sobre él: nunca
//! crea, borra ni reordena stages. Las capacidades opcionales de un
//! controller (ejecución condicional, corpus) se consultan con `as_*` en
//! lugar de inspeccionar tipos.
use serde_json::Value;

use crate::errors::ParameterRejection;
use crate::model::RunMode;

/// Un stage (processing resource) dentro de un controller.
pub trait StageHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Valor actual de un parámetro de runtime.
    fn parameter(&self, name: &str) -> Option<Value>;

    /// Setter estándar de parámetros de runtime.
    fn set_parameter(&mut self, name: &str, value: &Value) -> Result<(), ParameterRejection>;

    /// Controller embebido si este stage envuelve un sub-pipeline.
    fn nested_controller(&mut self) -> Option<&mut dyn ControllerHandle> {
        None
    }
}

/// Un controller con sus stages hijos directos, en orden de definición.
pub trait ControllerHandle: Send + Sync {
    fn name(&self) -> &str;

    fn stage_count(&self) -> usize;

    fn stage(&self, index: usize) -> Option<&dyn StageHandle>;

    fn stage_mut(&mut self, index: usize) -> Option<&mut dyn StageHandle>;

    fn as_conditional(&mut self) -> Option<&mut dyn ConditionalExecutionCapable> {
        None
    }

    fn as_corpus_aware(&mut self) -> Option<&mut dyn CorpusAware> {
        None
    }

    fn supports_conditional_execution(&mut self) -> bool {
        self.as_conditional().is_some()
    }

    /// Copia profunda del grafo vivo, con el estado actual de sus stages.
    /// `None` si el host no sabe duplicar este controller.
    fn duplicate_graph(&self) -> Option<Box<dyn ControllerHandle>> {
        None
    }

    /// Nombres de los stages hijos, en orden.
    fn stage_names(&self) -> Vec<String> {
        (0..self.stage_count()).filter_map(|i| self.stage(i).map(|s| s.name().to_string()))
                               .collect()
    }
}

/// Controller que puede decidir por stage si éste se ejecuta.
pub trait ConditionalExecutionCapable {
    fn set_run_mode(&mut self, stage_index: usize, mode: RunMode);

    fn run_mode(&self, stage_index: usize) -> Option<RunMode>;
}

/// Controller que recorre un corpus y necesita recibirlo antes de ejecutar.
pub trait CorpusAware {
    fn set_corpus(&mut self, corpus: Option<String>);
}

/// Documento sobre el que se escriben los `document_features`.
pub trait DocumentHandle {
    fn set_feature(&mut self, name: &str, value: Value);
}
