use std::path::PathBuf;

use crate::errors::{InvoiceParserError, InvoiceParserResult};

pub const CREDENTIALS_PATH_VAR: &str = "GOOGLE_CREDENTIALS_PATH";
pub const SPREADSHEET_ID_VAR: &str = "SPREADSHEET_ID";
pub const SHEET_NAME_VAR: &str = "SHEET_NAME";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the service-account JSON key file.
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
    /// Target tab. When absent, ranges are unqualified and resolve to the first sheet.
    pub sheet_name: Option<String>,
}

impl AppConfig {
    /// Builds the config from an arbitrary variable lookup.
    /// Required values that are missing or blank are reported by variable name.
    pub fn from_lookup<F>(lookup: F) -> InvoiceParserResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> InvoiceParserResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    InvoiceParserError::Config(format!("{key} environment variable is not set"))
                })
        };

        let credentials_path = PathBuf::from(required(CREDENTIALS_PATH_VAR)?);
        let spreadsheet_id = required(SPREADSHEET_ID_VAR)?;
        let sheet_name = lookup(SHEET_NAME_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            credentials_path,
            spreadsheet_id,
            sheet_name,
        })
    }
}

pub fn load_config() -> InvoiceParserResult<AppConfig> {
    let config = AppConfig::from_lookup(|key| std::env::var(key).ok())?;
    tracing::info!(
        credentials = %config.credentials_path.display(),
        spreadsheet_id = %config.spreadsheet_id,
        sheet = config.sheet_name.as_deref().unwrap_or("<first>"),
        "config loaded"
    );
    Ok(config)
}
