use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de overlay: {0}")]
    Overlay(#[from] modflow_core::OverlayError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
}
