use config::{Config, ConfigError, Environment};
use log::info;

use super::models::Settings;

const DEFAULT_MIME_TYPES: [&str; 7] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/jpg",
];

const DEFAULT_EXTENSIONS: [&str; 7] = [".pdf", ".txt", ".doc", ".docx", ".jpg", ".jpeg", ".png"];

const DEFAULT_PROBE_NAMES: [&str; 3] = ["7100cn", "LBP-7100cn", "printer"];

pub fn load_config() -> Result<Settings, ConfigError> {
    // As Rust has no native support for .env files,
    // we use the dotenv_flow crate to import to actual ENV vars.
    if let Ok(dotenv_path) = dotenv_flow::dotenv_flow() {
        info!("Loaded dotenv file: {:?}", dotenv_path);
    }

    let config = Config::builder()
        .add_source(Environment::default()
            .prefix("C2W")
            .separator("_")
            .prefix_separator("_")
            .try_parsing(true)
            .with_list_parse_key("cups.probenames")
            .with_list_parse_key("upload.allowedmimetypes")
            .with_list_parse_key("upload.allowedextensions")
            .list_separator(","))
            .set_default("http.bind", "0.0.0.0:3000")?
            .set_default("cups.uri", "http://localhost:631/")?
            .set_default("cups.ignoretlserrors", "true")?
            .set_default("cups.username", "")?
            .set_default("cups.password", "")?
            .set_default("cups.requesttimeout", "15s")?
            .set_default("cups.joblimit", "100")?
            .set_default("cups.probenames", DEFAULT_PROBE_NAMES.to_vec())?
            .set_default("cups.placeholderprinter", "7100cn")?
            .set_default("upload.maxsize", "52428800")?
            .set_default("upload.allowedmimetypes", DEFAULT_MIME_TYPES.to_vec())?
            .set_default("upload.allowedextensions", DEFAULT_EXTENSIONS.to_vec())?
            .set_default("history.path", "data/history.json")?
            .set_default("history.limit", "50")?
            .set_default("sentrydsn", "")?
        .build()?;

    config.try_deserialize()
}
