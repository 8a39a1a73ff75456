//! Parseo de fuentes reales desde disco (formatos A y B).

use std::fs;
use std::path::PathBuf;

use modflow_core::source::{load_overrides, parse_source, read_properties};
use modflow_core::{ConfigContext, OverlayError, StageAddress};
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &TempDir, file: &str, text: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, text).expect("write config");
    path
}

#[test]
fn properties_docfeature_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "conf.properties", "docfeature.title=Hello\n");
    let set = parse_source(&path, &ConfigContext::new()).expect("parse");
    assert_eq!(serde_json::Value::Object(set.document_features), json!({"title": "Hello"}));
}

#[test]
fn properties_grouping_is_order_independent() {
    let lines = ["prparm.a.controller=main",
                 "prparm.a.prname=tagger",
                 "prparm.a.name=threshold",
                 "prparm.a.value=0.7",
                 "prparm.b.controller=sub",
                 "prparm.b.prname=ner",
                 "prparm.b.name=model",
                 "prparm.b.value=big",
                 "prparm.c.controller=main",
                 "prparm.c.prname=tagger",
                 "prparm.c.name=lang",
                 "prparm.c.value=en"];
    let dir = TempDir::new().unwrap();
    let forward = write(&dir, "forward.properties", &lines.join("\n"));
    let reversed: Vec<&str> = lines.iter().rev().copied().collect();
    let backward = write(&dir, "backward.properties", &reversed.join("\n"));

    let a = parse_source(&forward, &ConfigContext::new()).unwrap();
    let b = parse_source(&backward, &ConfigContext::new()).unwrap();
    assert_eq!(a.to_json()["runtime_params"], b.to_json()["runtime_params"]);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.runtime_params.len(), 2);
    assert_eq!(a.runtime_params[&StageAddress::new("main", "tagger")].parameters.len(), 2);
}

#[test]
fn yaml_records_merge_under_one_address() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir,
                     "conf.yaml",
                     r#"
- set: prparm
  controller: main
  prname: tagger
  name: threshold
  value: 0.7
- set: prparm
  controller: main
  prname: tagger
  name: lang
  value: en
- set: prrun
  controller: main
  prname: ner
  value: false
"#);
    let set = parse_source(&path, &ConfigContext::new()).unwrap();
    assert_eq!(set.runtime_params.len(), 2);
    let tagger = &set.runtime_params[&StageAddress::new("main", "tagger")];
    assert_eq!(tagger.parameters["threshold"], json!(0.7));
    assert_eq!(tagger.parameters["lang"], json!("en"));
    assert_eq!(set.runtime_params[&StageAddress::new("main", "ner")].run_flag, Some(false));
}

#[test]
fn prrun_with_non_boolean_value_fails() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "conf.yml", "- set: prrun\n  controller: main\n  prname: ner\n  value: \"yes\"\n");
    assert!(matches!(parse_source(&path, &ConfigContext::new()), Err(OverlayError::TypeMismatch { .. })));
}

#[test]
fn unsupported_extension_fails_without_reading() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "conf.json", "{\"docfeature.title\": \"Hello\"}");
    match parse_source(&path, &ConfigContext::new()) {
        Err(OverlayError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, "json"),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(matches!(parse_source(&path, &ConfigContext::new()), Err(OverlayError::Io { .. })));
}

#[test]
fn propset_reaches_the_supplied_context_only() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "conf.properties", "propset.modflow.test.flag=on\n");
    let ctx = ConfigContext::new();
    let other = ConfigContext::new();
    parse_source(&path, &ctx).unwrap();
    assert_eq!(ctx.get("modflow.test.flag").as_deref(), Some("on"));
    assert_eq!(other.get("modflow.test.flag"), None);
}

#[test]
fn properties_reader_matches_file_contents() {
    let props = read_properties("a = 1\r\nb=2\r\n");
    assert_eq!(props["a"], "1");
    assert_eq!(props["b"], "2");
}

#[test]
fn file_url_with_escaped_spaces_is_read() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("my conf")).unwrap();
    fs::write(dir.path().join("my conf").join("c.properties"), "docfeature.title=Hello\n").unwrap();
    let url = format!("file://{}/my%20conf/c.properties", dir.path().display());
    let set = load_overrides(Some(&url), &ConfigContext::new()).expect("parse");
    assert_eq!(set.document_features["title"], json!("Hello"));
}
