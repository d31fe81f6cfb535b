use std::collections::HashMap;
use std::env;

/// Object storage configuration shared by every provider.
///
/// `options` carries backend-specific extras that do not map onto the common
/// fields (for example `path_style=true` for an S3 endpoint that requires it).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Provider name resolved by the factory ("minio", "s3", "memory")
    pub provider: String,
    /// Endpoint host (and optional port), or a full URL
    pub endpoint: String,
    /// Region used for request signing
    pub region: String,
    /// Whether to talk to the endpoint over TLS when no scheme is given
    pub use_ssl: bool,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket ensured at startup and used for new uploads
    pub default_bucket: String,
    /// Provider-specific options
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    const DEFAULT_PROVIDER: &'static str = "minio";
    const DEFAULT_ENDPOINT: &'static str = "localhost:9000";
    const DEFAULT_REGION: &'static str = "us-east-1";
    const DEFAULT_BUCKET: &'static str = "pulse-files";

    pub fn from_env() -> Result<Self, String> {
        let provider = env::var("STORAGE_PROVIDER")
            .unwrap_or_else(|_| Self::DEFAULT_PROVIDER.to_string())
            .trim()
            .to_lowercase();

        let endpoint =
            env::var("STORAGE_ENDPOINT").unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());

        let region =
            env::var("STORAGE_REGION").unwrap_or_else(|_| Self::DEFAULT_REGION.to_string());

        let use_ssl = env::var("STORAGE_USE_SSL")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .map_err(|_| "STORAGE_USE_SSL must be true or false".to_string())?;

        let access_key = env::var("STORAGE_ACCESS_KEY").unwrap_or_default();
        let secret_key = env::var("STORAGE_SECRET_KEY").unwrap_or_default();

        let default_bucket =
            env::var("STORAGE_DEFAULT_BUCKET").unwrap_or_else(|_| Self::DEFAULT_BUCKET.to_string());

        let options = parse_options(&env::var("STORAGE_OPTIONS").unwrap_or_default())?;

        Ok(Self {
            provider,
            endpoint,
            region,
            use_ssl,
            access_key,
            secret_key,
            default_bucket,
            options,
        })
    }

    /// Endpoint as a URL, adding a scheme from `use_ssl` when none is present
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if self.use_ssl {
            format!("https://{}", endpoint)
        } else {
            format!("http://{}", endpoint)
        }
    }

    /// Boolean provider option; missing or unparsable values yield `default`
    pub fn option_flag(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(default)
    }
}

/// Parse `key=value` pairs separated by commas
fn parse_options(raw: &str) -> Result<HashMap<String, String>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid STORAGE_OPTIONS entry '{}': expected key=value", pair))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, use_ssl: bool) -> StorageConfig {
        StorageConfig {
            provider: "minio".to_string(),
            endpoint: endpoint.to_string(),
            region: "us-east-1".to_string(),
            use_ssl,
            access_key: String::new(),
            secret_key: String::new(),
            default_bucket: "bucket".to_string(),
            options: HashMap::new(),
        }
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        assert_eq!(config("minio:9000", false).endpoint_url(), "http://minio:9000");
        assert_eq!(config("minio:9000", true).endpoint_url(), "https://minio:9000");
        assert_eq!(
            config("https://s3.example.com/", false).endpoint_url(),
            "https://s3.example.com"
        );
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options("path_style=true, account = acme").unwrap();
        assert_eq!(options.get("path_style").map(String::as_str), Some("true"));
        assert_eq!(options.get("account").map(String::as_str), Some("acme"));
        assert!(parse_options("").unwrap().is_empty());
        assert!(parse_options("broken").is_err());
    }
}
