//! Contexto de configuración: el canal lateral de settings globales.
//!
//! Los registros `propset` de una fuente escriben aquí de inmediato (último
//! escritor gana). El contexto se pasa explícitamente por el camino de carga;
//! `ConfigContext::global()` existe sólo para los puntos de entrada de nivel
//! superior que no reciben uno. Cargas concurrentes que dependan de estos
//! settings deben serializarse externamente si necesitan resultados deterministas.
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use dotenvy::dotenv;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::constants::{CONFIG_FILE_ENV, CONFIG_FILE_SETTING, STRICT_RECORDS_ENV};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

static GLOBAL_CONTEXT: Lazy<Arc<ConfigContext>> = Lazy::new(|| Arc::new(ConfigContext::from_env()));

/// Variables de entorno relevantes para el overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModflowEnv {
    /// Fuente de configuración que reemplaza a la que indica el pipeline.
    pub config_file: Option<PathBuf>,
    /// Registros mal formados del formato B fallan en lugar de ignorarse.
    pub strict_records: bool,
}

impl ModflowEnv {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let config_file = env::var_os(CONFIG_FILE_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        let strict_records = env::var(STRICT_RECORDS_ENV).ok()
                                                        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                                                        .unwrap_or(false);
        Self { config_file, strict_records }
    }
}

#[derive(Debug, Default)]
pub struct ConfigContext {
    settings: RwLock<IndexMap<String, String>>,
    env: ModflowEnv,
}

impl ConfigContext {
    /// Contexto vacío, sin leer el entorno.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self { settings: RwLock::default(),
               env: ModflowEnv::from_env() }
    }

    pub fn with_env(env: ModflowEnv) -> Self {
        Self { settings: RwLock::default(), env }
    }

    /// Instancia de proceso para puntos de entrada sin contexto explícito.
    pub fn global() -> Arc<ConfigContext> {
        Arc::clone(&GLOBAL_CONTEXT)
    }

    /// Escribe un setting y devuelve el valor previo, si lo había.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let mut guard = self.settings.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let guard = self.settings.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Fuente de configuración forzada: primero el setting `modflow.configFile`,
    /// luego la variable de entorno.
    pub fn config_file_override(&self) -> Option<PathBuf> {
        self.get(CONFIG_FILE_SETTING)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.env.config_file.clone())
    }

    pub fn strict_records(&self) -> bool {
        self.env.strict_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_previous_value() {
        let ctx = ConfigContext::new();
        assert_eq!(ctx.set("a", "1"), None);
        assert_eq!(ctx.set("a", "2"), Some("1".to_string()));
        assert_eq!(ctx.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn setting_override_wins_over_env() {
        let ctx = ConfigContext::with_env(ModflowEnv { config_file: Some(PathBuf::from("/env/conf.yaml")),
                                                       strict_records: false });
        assert_eq!(ctx.config_file_override(), Some(PathBuf::from("/env/conf.yaml")));
        ctx.set(CONFIG_FILE_SETTING, "/set/conf.properties");
        assert_eq!(ctx.config_file_override(), Some(PathBuf::from("/set/conf.properties")));
    }

    #[test]
    fn empty_context_has_no_override() {
        let ctx = ConfigContext::new();
        assert_eq!(ctx.config_file_override(), None);
        assert!(!ctx.strict_records());
        assert!(ctx.snapshot().is_empty());
    }
}
