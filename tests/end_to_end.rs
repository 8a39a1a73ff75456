//! Escenarios completos sobre el pipeline de demo (main -> annie).

use std::fs;
use std::sync::Arc;

use modflow_rust::demo;
use modflow_rust::{ConfigContext, ControllerHandle, LoadRequest, RunMode, StageHandle, SubPipeline};
use rayon::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn load(dir: &TempDir) -> SubPipeline {
    let config = demo::write_demo_config(dir.path()).expect("write config");
    let request = LoadRequest::new(demo::MAIN_URL).with_config_source(config.to_string_lossy());
    SubPipeline::load("main-pr", Arc::new(demo::loader()), request, Arc::new(ConfigContext::new())).expect("load")
}

fn annie(main: &mut dyn ControllerHandle) -> &mut dyn ControllerHandle {
    main.stage_mut(1)
        .and_then(|s| s.nested_controller())
        .expect("annie sub-pipeline")
}

#[test]
fn demo_config_reaches_both_levels() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = load(&dir);
    let main = pipeline.nested_controller().expect("loaded");
    assert_eq!(main.stage(2).and_then(|s| s.parameter("format")), Some(json!("json")));

    let inner = annie(main);
    assert_eq!(inner.stage(2).and_then(|s| s.parameter("threshold")), Some(json!(0.75)));
    let conditional = inner.as_conditional().expect("conditional");
    assert_eq!(conditional.run_mode(1), Some(RunMode::Never));
    assert_eq!(conditional.run_mode(0), Some(RunMode::Always));
    assert_eq!(conditional.run_mode(2), Some(RunMode::Always));
}

#[test]
fn docfeature_title_end_to_end() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("title.properties");
    fs::write(&conf, "docfeature.title=Hello\n").unwrap();
    let set = modflow_rust::parse_source(&conf, &ConfigContext::new()).expect("parse");
    assert_eq!(serde_json::Value::Object(set.document_features), json!({"title": "Hello"}));
}

#[test]
fn duplicates_are_independent() {
    let dir = TempDir::new().unwrap();
    let pipeline = load(&dir);
    let mut copies: Vec<SubPipeline> = (0..4).into_par_iter()
                                             .map(|_| pipeline.duplicate().expect("duplicate"))
                                             .collect();

    let first = copies[0].nested_controller().expect("loaded");
    first.stage_mut(0)
         .expect("reader")
         .set_parameter("encoding", &json!("latin-1"))
         .expect("set");

    for copy in copies.iter_mut().skip(1) {
        let main = copy.nested_controller().expect("loaded");
        assert_eq!(main.stage(0).and_then(|s| s.parameter("encoding")), None);
        assert_eq!(main.stage(2).and_then(|s| s.parameter("format")), Some(json!("json")));
    }
}

#[test]
fn invalid_demo_value_is_rejected_with_context() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("bad.yaml");
    fs::write(&conf, "- set: prparm\n  controller: annie\n  prname: gazetteer\n  name: caseSensitive\n  value: maybe\n").unwrap();
    let request = LoadRequest::new(demo::MAIN_URL).with_config_source(conf.to_string_lossy());
    let err = SubPipeline::load("main-pr", Arc::new(demo::loader()), request, Arc::new(ConfigContext::new())).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("caseSensitive"), "{msg}");
    assert!(msg.contains("gazetteer"), "{msg}");
    assert!(msg.contains("annie"), "{msg}");
    assert!(msg.contains("maybe"), "{msg}");
}
