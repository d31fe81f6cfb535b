use std::sync::Arc;

use super::config::StorageConfig;
use super::error::StorageError;
use super::memory_provider::MemoryProvider;
use super::minio_provider::MinioProvider;
use super::provider::StorageProvider;
use super::s3_provider::S3Provider;

/// Provider names accepted in `STORAGE_PROVIDER`
pub const SUPPORTED_PROVIDERS: &[&str] = &["minio", "s3", "memory"];

/// Build the configured storage provider.
///
/// The provider is constructed but not initialized; call
/// [`StorageProvider::initialize`] once at startup. An unknown provider name
/// is a configuration error.
pub fn create_provider(config: &StorageConfig) -> Result<Arc<dyn StorageProvider>, StorageError> {
    match config.provider.as_str() {
        "minio" => Ok(Arc::new(MinioProvider::new(config)?)),
        "s3" => Ok(Arc::new(S3Provider::new(config)?)),
        "memory" => Ok(Arc::new(MemoryProvider::from_config(config))),
        other => Err(StorageError::UnsupportedProvider(format!(
            "'{}' (supported: {})",
            other,
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(provider: &str) -> StorageConfig {
        StorageConfig {
            provider: provider.to_string(),
            endpoint: "localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            use_ssl: false,
            access_key: "access".to_string(),
            secret_key: "secret".to_string(),
            default_bucket: "pulse-files".to_string(),
            options: HashMap::new(),
        }
    }

    #[test]
    fn test_factory_selects_provider_by_name() {
        for name in SUPPORTED_PROVIDERS {
            let provider = create_provider(&config(name)).unwrap();
            assert_eq!(provider.name(), *name);
            assert_eq!(provider.default_bucket(), "pulse-files");
        }
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let result = create_provider(&config("azure"));
        assert!(matches!(result, Err(StorageError::UnsupportedProvider(_))));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let mut config = config("s3");
        config.secret_key.clear();
        assert!(matches!(
            create_provider(&config),
            Err(StorageError::Configuration(_))
        ));
    }
}
