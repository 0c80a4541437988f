use fw_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor configuration error: {0}")]
    Config(#[from] CoreError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
