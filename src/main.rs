//! Demo: un evento de carga completo sobre el host en memoria.
use std::sync::Arc;

use log::info;
use modflow_core::{ConfigContext, InMemoryDocument, LoadRequest, SubPipeline};
use modflow_rust::demo;
use modflow_rust::errors::AppError;

fn run() -> Result<(), AppError> {
    let dir = std::env::temp_dir().join(format!("modflow-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let config = demo::write_demo_config(&dir)?;

    let ctx = Arc::new(ConfigContext::from_env());
    let request = LoadRequest::new(demo::MAIN_URL).with_config_source(config.to_string_lossy());
    let mut pipeline = SubPipeline::load("main-pr", Arc::new(demo::loader()), request, ctx)?;
    pipeline.bind_corpus(Some("demo-corpus"));

    let overrides = pipeline.overrides().ok_or_else(|| AppError::Config("pipeline not loaded".into()))?;
    println!("[demo] fingerprint: {}", overrides.fingerprint());
    println!("[demo] overrides: {}", serde_json::to_string_pretty(&overrides.to_json()).unwrap_or_default());

    let copy = pipeline.duplicate()?;
    info!("duplicated {} as {}", pipeline.id(), copy.id());

    let mut doc = InMemoryDocument { name: "doc-1".into(), ..Default::default() };
    pipeline.prepare_document(&mut doc);
    println!("[demo] document features: {}", serde_json::Value::Object(doc.features));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

fn main() {
    // Cargar variables de entorno desde .env si existe (MODFLOW_CONFIG_FILE)
    let _ = dotenvy::dotenv();
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("[demo] error: {e}");
        std::process::exit(1);
    }
}
