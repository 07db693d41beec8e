use std::path::PathBuf;

/// Port 8000, as the reference deployment
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory generated reports are saved to; reports are not saved when unset
    pub report_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("ORGSCOPE_PORT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            report_dir: std::env::var("ORGSCOPE_REPORT_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}
