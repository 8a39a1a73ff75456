use std::fs;
use std::path::Path;
use std::process::exit;

use log::info;
use modflow_core::{apply_runtime_params_nested, parse_source, ConfigContext, InMemoryController, OverlayError};
use serde_json::json;

const USAGE: &str = "uso: modflow-cli inspect <config> | apply <config> <graph.json>";

fn main() {
    // Cargar .env si existe (MODFLOW_CONFIG_FILE, MODFLOW_STRICT_RECORDS)
    let _ = dotenvy::dotenv();
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let ctx = ConfigContext::from_env();
    let outcome = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["inspect", config] => inspect(Path::new(config), &ctx),
        ["apply", config, graph] => apply(Path::new(config), Path::new(graph), &ctx),
        _ => {
            eprintln!("{USAGE}");
            exit(2);
        }
    };
    match outcome {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("[modflow] error: {e}");
            exit(4);
        }
    }
}

/// Fuente efectiva: el override del entorno gana sobre el argumento.
fn effective_source(config: &Path, ctx: &ConfigContext) -> std::path::PathBuf {
    ctx.config_file_override().unwrap_or_else(|| config.to_path_buf())
}

fn inspect(config: &Path, ctx: &ConfigContext) -> Result<String, OverlayError> {
    let source = effective_source(config, ctx);
    let set = parse_source(&source, ctx)?;
    info!("fuente {} parseada, fingerprint {}", source.display(), set.fingerprint());
    let out = json!({
        "source": source.display().to_string(),
        "fingerprint": set.fingerprint(),
        "overrides": set.to_json(),
    });
    Ok(pretty(&out))
}

fn apply(config: &Path, graph: &Path, ctx: &ConfigContext) -> Result<String, OverlayError> {
    let text = fs::read_to_string(graph).map_err(|source| OverlayError::Io { path: graph.to_path_buf(), source })?;
    let mut controller: InMemoryController =
        serde_json::from_str(&text).map_err(|e| OverlayError::Parse { path: graph.to_path_buf(), reason: e.to_string() })?;
    let set = parse_source(&effective_source(config, ctx), ctx)?;
    let applied = apply_runtime_params_nested(&mut controller, &set)?;
    info!("{applied} overrides aplicados sobre `{}`", graph.display());
    let out = json!({
        "applied": applied,
        "graph": controller,
    });
    Ok(pretty(&out))
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
