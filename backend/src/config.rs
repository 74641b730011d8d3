use crate::error::{PipelineError, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Open the upload page in a browser once the server is listening.
    pub open_browser: bool,
    // --- contact table ---
    pub supabase_url: String,
    pub supabase_key: String,
    pub contacts_table: String,
    pub contact_name_column: String,
    pub contact_field: String,
    // --- messaging ---
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_api_base: String,
    pub channel_prefix: String,
    pub sender_address: String,
    // --- storage ---
    pub dropbox_access_token: String,
    pub dropbox_api_base: String,
    pub dropbox_content_base: String,
    // --- report ---
    pub output_dir: PathBuf,
    pub logo_path: PathBuf,
    pub fonts_dir: PathBuf,
    pub institution_name: String,
    pub department_name: String,
    pub hod_signature: String,
    /// Zero-based index of the first subject column.
    pub subject_column_start: usize,
    pub call_timeout: Duration,
    pub keep_artifacts: bool,
    pub max_upload_bytes: usize,
    /// How long finished batches stay visible on the status endpoint.
    pub batch_retention: Duration,
}

/// Dotenv file read by [`Config::from_env`], relative to the working directory.
pub const DOTENV_FILE: &str = ".env";

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            open_browser: false,
            supabase_url: String::new(),
            supabase_key: String::new(),
            contacts_table: "sample_students".to_string(),
            contact_name_column: "name".to_string(),
            contact_field: "whatsapp_number".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_api_base: "https://api.twilio.com".to_string(),
            channel_prefix: "whatsapp:".to_string(),
            sender_address: "+14155238886".to_string(),
            dropbox_access_token: String::new(),
            dropbox_api_base: "https://api.dropboxapi.com".to_string(),
            dropbox_content_base: "https://content.dropboxapi.com".to_string(),
            output_dir: PathBuf::from("pdfs"),
            logo_path: PathBuf::from("assets/logo.jpeg"),
            fonts_dir: PathBuf::from("./fonts"),
            institution_name: "Erode Sengunthar Engineering College".to_string(),
            department_name: "Artificial Intelligence and Data Science".to_string(),
            hod_signature: "Signature of HoD/AI&DS".to_string(),
            subject_column_start: 3,
            call_timeout: Duration::from_secs(30),
            keep_artifacts: true,
            max_upload_bytes: 10 * 1024 * 1024,
            batch_retention: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment, after loading
    /// `.env` from the working directory when one exists.
    ///
    /// Unset optional variables fall back to [`Config::default`]; the three
    /// service credentials are required.
    pub fn from_env() -> Result<Self> {
        Self::from_env_file(Path::new(DOTENV_FILE))
    }

    /// Loads `path` into the process environment, then reads it.
    ///
    /// Variables already set in the environment win over the file. A missing
    /// file is not an error; a malformed one is.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        match dotenvy::from_path(path) {
            Ok(()) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(PipelineError::Config(format!(
                    "cannot load {}: {}",
                    path.display(),
                    e
                )))
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let string = |key: &str, fallback: String| lookup(key).unwrap_or(fallback);
        let path = |key: &str, fallback: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(fallback);
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipelineError::Config(format!("{} must be set", key)))
        };

        Ok(Self {
            host: string("HOST", default.host),
            port: parse(&lookup, "PORT", default.port)?,
            open_browser: parse(&lookup, "OPEN_BROWSER", default.open_browser)?,
            supabase_url: required("SUPABASE_URL")?,
            supabase_key: required("SUPABASE_KEY")?,
            contacts_table: string("CONTACTS_TABLE", default.contacts_table),
            contact_name_column: string("CONTACT_NAME_COLUMN", default.contact_name_column),
            contact_field: string("CONTACT_FIELD", default.contact_field),
            twilio_account_sid: required("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: required("TWILIO_AUTH_TOKEN")?,
            twilio_api_base: string("TWILIO_API_BASE", default.twilio_api_base),
            channel_prefix: string("CHANNEL_PREFIX", default.channel_prefix),
            sender_address: string("SENDER_ADDRESS", default.sender_address),
            dropbox_access_token: required("DROPBOX_ACCESS_TOKEN")?,
            dropbox_api_base: string("DROPBOX_API_BASE", default.dropbox_api_base),
            dropbox_content_base: string("DROPBOX_CONTENT_BASE", default.dropbox_content_base),
            output_dir: path("OUTPUT_DIR", default.output_dir),
            logo_path: path("LOGO_PATH", default.logo_path),
            fonts_dir: path("FONTS_DIR", default.fonts_dir),
            institution_name: string("INSTITUTION_NAME", default.institution_name),
            department_name: string("DEPARTMENT_NAME", default.department_name),
            hod_signature: string("HOD_SIGNATURE", default.hod_signature),
            subject_column_start: parse(&lookup, "SUBJECT_COLUMN_START", default.subject_column_start)?,
            call_timeout: Duration::from_secs(parse(
                &lookup,
                "CALL_TIMEOUT_SECS",
                default.call_timeout.as_secs(),
            )?),
            keep_artifacts: parse(&lookup, "KEEP_ARTIFACTS", default.keep_artifacts)?,
            max_upload_bytes: parse(&lookup, "MAX_UPLOAD_BYTES", default.max_upload_bytes)?,
            batch_retention: Duration::from_secs(parse(
                &lookup,
                "BATCH_RETENTION_SECS",
                default.batch_retention.as_secs(),
            )?),
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, fallback: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| PipelineError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(fallback),
    }
}
