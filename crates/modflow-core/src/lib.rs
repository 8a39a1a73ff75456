//! modflow-core: overlay de configuración para pipelines modulares.
//!
//! Un pipeline de nivel superior embebe referencias a otros pipelines
//! (sub-pipelines) y una fuente de configuración externa sobreescribe
//! parámetros de construcción y de runtime, y los run flags, de cualquier
//! stage en cualquier nivel de anidamiento, sin tocar las definiciones guardadas.
//!
//! Flujo por evento de carga: `source` parsea la fuente a un `OverrideSet`,
//! `injection` lo fusiona con los parámetros de construcción y `apply` lo
//! aplica sobre el grafo ya instanciado. `pipeline` orquesta las tres fases.
pub mod apply;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod host;
pub mod injection;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod source;

pub use apply::{apply_document_features, apply_runtime_params, apply_runtime_params_nested};
pub use errors::{OverlayError, ParameterRejection};
pub use host::{ConditionalExecutionCapable, ControllerHandle, CorpusAware, DocumentHandle, StageHandle};
pub use injection::{merge_init_params, merge_stage_init_params};
pub use memory::{InMemoryController, InMemoryDocument, InMemoryLoader, InMemoryStage, ParamKind};
pub use model::{InitParams, OverrideSet, ParamMap, RunMode, StageAddress, StageOverride};
pub use pipeline::{duplicate_pipeline, load_pipeline, LoadRequest, LoadedPipeline, PipelineLoader, SubPipeline};
pub use settings::{ConfigContext, ModflowEnv};
pub use source::{load_overrides, parse, parse_source, resolve_source, SourceFormat};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controller() -> InMemoryController {
        InMemoryController::conditional("main").with_stage(InMemoryStage::new("tok"))
                                               .with_stage(InMemoryStage::new("tagger").with_schema("threshold", ParamKind::Number))
                                               .with_stage(InMemoryStage::new("ner"))
    }

    #[test]
    fn prrun_false_disables_only_the_named_stage() {
        let mut set = OverrideSet::new();
        set.set_run_flag(StageAddress::new("main", "ner"), false);
        let mut c = controller();
        let applied = apply_runtime_params(&mut c, &set).expect("apply");
        assert_eq!(applied, 1);
        assert_eq!(c.effective_run_mode(2), RunMode::Never);
        assert_eq!(c.effective_run_mode(0), RunMode::Always);
        assert_eq!(c.effective_run_mode(1), RunMode::Always);
    }

    #[test]
    fn run_flag_on_plain_controller_is_a_no_op() {
        let mut set = OverrideSet::new();
        set.set_run_flag(StageAddress::new("main", "ner"), false);
        set.set_runtime_param(StageAddress::new("main", "ner"), "model", json!("big"));
        let mut c = InMemoryController::new("main").with_stage(InMemoryStage::new("ner"));
        assert_eq!(apply_runtime_params(&mut c, &set).expect("apply"), 1);
        assert!(c.run_modes.is_empty());
        assert_eq!(c.stages[0].params["model"], json!("big"));
    }

    #[test]
    fn duplicate_stage_names_fail_before_any_write() {
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("main", "a"), "x", json!(1));
        let mut c = InMemoryController::new("main").with_stage(InMemoryStage::new("a"))
                                                   .with_stage(InMemoryStage::new("tagger"))
                                                   .with_stage(InMemoryStage::new("tagger"));
        match apply_runtime_params(&mut c, &set) {
            Err(OverlayError::DuplicateStageName { controller, stage }) => {
                assert_eq!(controller, "main");
                assert_eq!(stage, "tagger");
            }
            other => panic!("expected DuplicateStageName, got {other:?}"),
        }
        assert!(c.stages[0].params.is_empty());
    }

    #[test]
    fn dangling_reference_aborts_without_writing_siblings() {
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("main", "tok"), "x", json!(1));
        set.set_runtime_param(StageAddress::new("main", "missing"), "x", json!(1));
        set.set_runtime_param(StageAddress::new("main", "ner"), "x", json!(1));
        let mut c = controller();
        match apply_runtime_params(&mut c, &set) {
            Err(OverlayError::DanglingReference(addr)) => assert_eq!(addr, StageAddress::new("main", "missing")),
            other => panic!("expected DanglingReference, got {other:?}"),
        }
        assert!(c.stages.iter().all(|s| s.params.is_empty()));
    }

    #[test]
    fn rejected_parameter_names_stage_parameter_and_value() {
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("main", "tagger"), "threshold", json!("high"));
        let mut c = controller();
        match apply_runtime_params(&mut c, &set) {
            Err(OverlayError::ParameterRejected { controller, stage, parameter, value, .. }) => {
                assert_eq!(controller, "main");
                assert_eq!(stage, "tagger");
                assert_eq!(parameter, "threshold");
                assert_eq!(value, json!("high"));
            }
            other => panic!("expected ParameterRejected, got {other:?}"),
        }
    }

    #[test]
    fn overrides_for_other_controllers_are_ignored() {
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("other", "nowhere"), "x", json!(1));
        let mut c = controller();
        assert_eq!(apply_runtime_params(&mut c, &set).expect("apply"), 0);
    }

    #[test]
    fn nested_controllers_receive_their_overrides() {
        let inner = InMemoryController::conditional("inner").with_stage(InMemoryStage::new("ner"));
        let mut outer = InMemoryController::new("outer").with_stage(InMemoryStage::new("tok"))
                                                        .with_stage(InMemoryStage::new("sub").with_nested(inner));
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("outer", "tok"), "lang", json!("de"));
        set.set_runtime_param(StageAddress::new("inner", "ner"), "model", json!("big"));
        set.set_run_flag(StageAddress::new("inner", "ner"), false);

        assert_eq!(apply_runtime_params_nested(&mut outer, &set).expect("apply"), 3);
        let inner = outer.stages[1].nested.as_ref().unwrap();
        assert_eq!(inner.stages[0].params["model"], json!("big"));
        assert_eq!(inner.effective_run_mode(0), RunMode::Never);
        assert_eq!(outer.stages[0].params["lang"], json!("de"));
    }

    #[test]
    fn unknown_controller_in_graph_is_dangling() {
        let inner = InMemoryController::conditional("annie").with_stage(InMemoryStage::new("ner"));
        let mut outer = InMemoryController::new("main").with_stage(InMemoryStage::new("tok"))
                                                       .with_stage(InMemoryStage::new("annie-pr").with_nested(inner));
        let mut set = OverrideSet::new();
        set.set_runtime_param(StageAddress::new("main", "tok"), "lang", json!("de"));
        set.set_runtime_param(StageAddress::new("anie", "ner"), "model", json!("big"));

        match apply_runtime_params_nested(&mut outer, &set) {
            Err(OverlayError::DanglingReference(addr)) => assert_eq!(addr, StageAddress::new("anie", "ner")),
            other => panic!("expected DanglingReference, got {other:?}"),
        }
        // nada escrito en ningún nivel
        assert!(outer.stages[0].params.is_empty());
        assert!(outer.stages[1].nested.as_ref().unwrap().stages[0].params.is_empty());
    }

    #[test]
    fn duplicate_stage_names_fail_with_any_config() {
        let mut set = OverrideSet::new();
        set.set_document_feature("title", json!("Hello"));
        let mut c = InMemoryController::new("main").with_stage(InMemoryStage::new("tagger"))
                                                   .with_stage(InMemoryStage::new("tagger"));
        assert!(matches!(apply_runtime_params(&mut c, &set), Err(OverlayError::DuplicateStageName { .. })));
        // sin configuración no hay nada que validar
        assert_eq!(apply_runtime_params(&mut c, &OverrideSet::new()).expect("apply"), 0);
    }

    #[test]
    fn document_features_are_written() {
        let mut set = OverrideSet::new();
        set.set_document_feature("title", json!("Hello"));
        let mut doc = InMemoryDocument::default();
        apply_document_features(&mut doc, &set);
        assert_eq!(doc.features["title"], json!("Hello"));
    }
}
