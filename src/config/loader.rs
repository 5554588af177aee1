// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration loader with environment variable substitution

use super::types::*;
use crate::storage::BackendKind;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").expect("env var pattern is valid")
});

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<UnistoreConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from YAML text
    pub fn parse(content: &str) -> Result<UnistoreConfig> {
        let content = Self::substitute_env_vars(content);

        let config: UnistoreConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${MINIO_ENDPOINT:-localhost:9000} -> localhost:9000 (if MINIO_ENDPOINT not set)
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                let default_value = caps.get(2).map(|m| m.as_str());

                match std::env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => match default_value {
                        Some(default) => default.to_string(),
                        // Keep original if no default and var not found
                        None => format!("${{{}}}", var_name),
                    },
                }
            })
            .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &UnistoreConfig) -> Result<()> {
        let storage = &config.storage;

        match storage.backend {
            kind @ (BackendKind::Minio | BackendKind::S3) => {
                let s3 = storage.backend_config.as_s3().ok_or_else(|| {
                    anyhow!("{} backend selected but s3 config missing", kind)
                })?;

                if s3.bucket.trim().is_empty() {
                    bail!("s3.bucket cannot be empty");
                }
                s3.endpoint_url()
                    .map_err(|reason| anyhow!("s3.endpoint is invalid: {}", reason))?;
                if s3.access_key_id.is_empty() != s3.access_key_secret.is_empty() {
                    bail!("s3.access_key_id and s3.access_key_secret must be set together");
                }
            }
            BackendKind::Filesystem => {
                let filesystem = storage.backend_config.as_filesystem().ok_or_else(|| {
                    anyhow!("filesystem backend selected but filesystem config missing")
                })?;

                if filesystem.root.trim().is_empty() {
                    bail!("filesystem.root cannot be empty");
                }
            }
        }

        match config.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => bail!("logging.level '{}' is not one of trace, debug, info, warn, error", other),
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            other => bail!("logging.format '{}' must be 'text' or 'json'", other),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filesystem_config() -> UnistoreConfig {
        UnistoreConfig {
            storage: StorageConfig::filesystem("/tmp/unistore"),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("UNISTORE_LOADER_TEST_VAR", "test_value");

        let input = "endpoint: ${UNISTORE_LOADER_TEST_VAR}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "endpoint: test_value");

        std::env::remove_var("UNISTORE_LOADER_TEST_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("UNISTORE_LOADER_TEST_VAR2");

        let input = "endpoint: ${UNISTORE_LOADER_TEST_VAR2:-localhost:9000}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "endpoint: localhost:9000");
    }

    #[test]
    fn test_missing_env_var_kept_verbatim() {
        std::env::remove_var("UNISTORE_LOADER_TEST_VAR3");

        let output = ConfigLoader::substitute_env_vars("bucket: ${UNISTORE_LOADER_TEST_VAR3}");
        assert_eq!(output, "bucket: ${UNISTORE_LOADER_TEST_VAR3}");
    }

    #[test]
    fn test_validation_empty_bucket() {
        let config = UnistoreConfig::default();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("bucket"));
    }

    #[test]
    fn test_validation_backend_config_mismatch() {
        let mut config = filesystem_config();
        config.storage.backend = BackendKind::Minio;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("s3 config missing"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = filesystem_config();
        config.logging.level = "verbose".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_validation_filesystem_ok() {
        assert!(ConfigLoader::validate(&filesystem_config()).is_ok());
    }
}
