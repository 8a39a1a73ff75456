//! Constantes del motor de overrides.
//!
//! Agrupa los nombres reservados del formato de configuración (prefijos de
//! claves, discriminadores de registros) y las claves de entorno. Cambiar
//! cualquiera de estos valores rompe la compatibilidad con los archivos de
//! configuración existentes.

/// Versión lógica del formato de overrides. Entra en el fingerprint de un
/// `OverrideSet`, de modo que un cambio de formato invalida fingerprints previos.
pub const OVERLAY_FORMAT_VERSION: &str = "M1.0";

/// Extensión del formato plano clave-valor (formato A).
pub const PROPERTIES_EXTENSION: &str = "properties";
/// Extensiones aceptadas para el formato de registros (formato B).
pub const RECORD_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Prefijos de clave del formato A.
pub const DOCFEATURE_PREFIX: &str = "docfeature.";
pub const PRPARM_PREFIX: &str = "prparm.";
pub const PRINIT_PREFIX: &str = "prinit.";
pub const PROPSET_PREFIX: &str = "propset.";

/// Campos requeridos de un setting `prparm`/`prinit`, en orden de reporte.
pub const SETTING_FIELDS: [&str; 4] = ["prname", "name", "value", "controller"];

/// Campo discriminador de los registros del formato B.
pub const RECORD_DISCRIMINATOR: &str = "set";

/// Clave de setting que redirige la fuente de configuración de cualquier
/// carga de pipeline (equivalente a una propiedad de sistema).
pub const CONFIG_FILE_SETTING: &str = "modflow.configFile";
/// Variable de entorno equivalente a `CONFIG_FILE_SETTING`.
pub const CONFIG_FILE_ENV: &str = "MODFLOW_CONFIG_FILE";
/// Variable de entorno que vuelve estrictos los registros mal formados del formato B.
pub const STRICT_RECORDS_ENV: &str = "MODFLOW_STRICT_RECORDS";
