use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SPACE: &str = "yisol/IDM-VTON";
pub const DEFAULT_API_NAME: &str = "tryon";
pub const DEFAULT_BUCKET: &str = "ai-try-on";
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Unknown staging strategy: {0}")]
    UnknownStrategy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStrategy {
    Inline,
    ObjectStorage,
    TempDir,
}

impl FromStr for StagingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "bytes" => Ok(StagingStrategy::Inline),
            "object-storage" | "s3" => Ok(StagingStrategy::ObjectStorage),
            "temp-dir" | "temp" | "tmp" => Ok(StagingStrategy::TempDir),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStorageConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub presign_expiry: Duration,
    pub force_path_style: bool,
}

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub space: String,
    pub base_url: Option<String>,
    pub api_name: String,
    pub hf_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            space: DEFAULT_SPACE.to_string(),
            base_url: None,
            api_name: DEFAULT_API_NAME.to_string(),
            hf_token: None,
            timeout: None,
        }
    }
}

/// Read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub frontend_dir: String,
    pub max_upload_bytes: usize,
    pub staging: StagingStrategy,
    pub scratch_dir: PathBuf,
    pub object_storage: Option<ObjectStorageConfig>,
    pub predictor: PredictorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let max_upload_bytes =
            parse_or(get("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let frontend_dir = get("FRONTEND_DIR").unwrap_or_else(|| {
            if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
                format!("{}/../frontend/dist", manifest_dir)
            } else {
                "/usr/src/app/frontend/dist".to_string()
            }
        });

        let staging = match get("STAGING_STRATEGY") {
            Some(value) => value.parse()?,
            None => StagingStrategy::Inline,
        };

        let scratch_dir = get("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("ai-try-on"));

        let object_storage = if staging == StagingStrategy::ObjectStorage {
            let secs = parse_or(
                get("S3_PRESIGN_EXPIRY_SECS"),
                "S3_PRESIGN_EXPIRY_SECS",
                DEFAULT_PRESIGN_EXPIRY_SECS,
            )?;
            let endpoint_url = get("S3_ENDPOINT_URL").ok_or(ConfigError::Missing("S3_ENDPOINT_URL"))?;
            Some(ObjectStorageConfig {
                endpoint_url: validate_url(endpoint_url, "S3_ENDPOINT_URL")?,
                access_key_id: get("AWS_ACCESS_KEY_ID")
                    .ok_or(ConfigError::Missing("AWS_ACCESS_KEY_ID"))?,
                secret_access_key: get("AWS_SECRET_ACCESS_KEY")
                    .ok_or(ConfigError::Missing("AWS_SECRET_ACCESS_KEY"))?,
                region: get("AWS_REGION").unwrap_or_else(|| "auto".to_string()),
                bucket: get("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
                presign_expiry: Duration::from_secs(secs),
                force_path_style: parse_bool_or(get("S3_FORCE_PATH_STYLE"), "S3_FORCE_PATH_STYLE", true)?,
            })
        } else {
            None
        };

        let timeout = parse_opt::<u64>(get("PREDICTOR_TIMEOUT_SECS"), "PREDICTOR_TIMEOUT_SECS")?
            .map(Duration::from_secs);

        let predictor = PredictorConfig {
            space: get("PREDICTOR_SPACE").unwrap_or_else(|| DEFAULT_SPACE.to_string()),
            base_url: get("PREDICTOR_BASE_URL")
                .map(|url| validate_url(url, "PREDICTOR_BASE_URL"))
                .transpose()?,
            api_name: get("PREDICTOR_API_NAME").unwrap_or_else(|| DEFAULT_API_NAME.to_string()),
            hf_token: get("HF_TOKEN"),
            timeout,
        };

        Ok(Self {
            port,
            frontend_dir,
            max_upload_bytes,
            staging,
            scratch_dir,
            object_storage,
            predictor,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_opt<T: FromStr>(value: Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value: raw })
        })
        .transpose()
}

fn parse_or<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_opt(value, name)?.unwrap_or(default))
}

fn validate_url(value: String, name: &'static str) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

fn parse_bool_or(value: Option<String>, name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::Invalid { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_inline_staging() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.staging, StagingStrategy::Inline);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.predictor.space, "yisol/IDM-VTON");
        assert_eq!(config.predictor.api_name, "tryon");
        assert!(config.predictor.timeout.is_none());
        assert!(config.object_storage.is_none());
    }

    #[test]
    fn object_storage_requires_credentials() {
        let err = config_from(&[("STAGING_STRATEGY", "s3")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("S3_ENDPOINT_URL")));
    }

    #[test]
    fn object_storage_defaults() {
        let config = config_from(&[
            ("STAGING_STRATEGY", "object-storage"),
            ("S3_ENDPOINT_URL", "https://storage.example"),
            ("AWS_ACCESS_KEY_ID", "key"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ])
        .unwrap();
        let storage = config.object_storage.unwrap();
        assert_eq!(storage.bucket, "ai-try-on");
        assert_eq!(storage.presign_expiry, Duration::from_secs(3600));
        assert!(storage.force_path_style);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("STAGING_STRATEGY", "ftp")]),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            config_from(&[("PREDICTOR_BASE_URL", "yisol-idm-vton.hf.space")]),
            Err(ConfigError::Invalid { name: "PREDICTOR_BASE_URL", .. })
        ));
    }

    #[test]
    fn reads_predictor_overrides() {
        let config = config_from(&[
            ("STAGING_STRATEGY", "temp"),
            ("SCRATCH_DIR", "/var/tmp/tryon"),
            ("PREDICTOR_BASE_URL", "http://localhost:7860"),
            ("PREDICTOR_TIMEOUT_SECS", "90"),
        ])
        .unwrap();
        assert_eq!(config.staging, StagingStrategy::TempDir);
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/tryon"));
        assert_eq!(config.predictor.base_url.as_deref(), Some("http://localhost:7860"));
        assert_eq!(config.predictor.timeout, Some(Duration::from_secs(90)));
    }
}
