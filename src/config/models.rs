use std::time::Duration;

use serde_derive::Deserialize;

// When changing anything here, make sure to add
// #[serde(alias = "ihavenounderscores")]
// where needed, so it can be read from the ENV vars.

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cups {
    pub uri: String,
    #[serde(alias = "ignoretlserrors")]
    pub ignore_tls_errors: bool,
    pub username: String,
    pub password: String,
    #[serde(alias = "requesttimeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(alias = "joblimit")]
    pub job_limit: i32,
    /// Printer names tried one by one when the server refuses to enumerate its printers.
    #[serde(alias = "probenames")]
    pub probe_names: Vec<String>,
    /// Printer reported for jobs that only carry a `job-uri`.
    #[serde(alias = "placeholderprinter")]
    pub placeholder_printer: String,
}

impl Cups {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// The user name sent as `requesting-user-name` on read-only queries.
    pub fn requesting_user(&self) -> &str {
        if self.username.is_empty() { "anonymous" } else { &self.username }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    #[serde(alias = "maxsize")]
    pub max_size: usize,
    #[serde(alias = "allowedmimetypes")]
    pub allowed_mime_types: Vec<String>,
    #[serde(alias = "allowedextensions")]
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct History {
    pub path: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub cups: Cups,
    pub upload: Upload,
    pub history: History,
    #[serde(alias = "sentrydsn")]
    pub sentry_dsn: Option<String>,
}
