//! Configuration for the storagebench host.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `SB__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults. The
//! configuration is read once at startup and never changes afterwards.
//!
//! # Environment Variables
//!
//! Environment variables use `SB__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `SB__MOUNT_PATH=/mnt/efs` sets the mount path of the shared filesystem
//! - `SB__READ_ITERATIONS=3` reads every object three times
//! - `SB__OBJECT_STORE__ENDPOINT=http://localhost:9000` sets the object store endpoint
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! mount_path: /mnt/efs
//! read_iterations: 3
//!
//! object_store:
//!   endpoint: http://localhost:9000
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use storagebench_service::{BenchConfig, BenchmarkMode, ObjectStoreConfig};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "SB__";

/// Connection settings for the remote object store.
///
/// Used in: [`Config::object_store`]
#[derive(Debug, Deserialize, Serialize)]
pub struct ObjectStore {
    /// Base URL of the S3-compatible endpoint.
    ///
    /// Objects are addressed path-style as `{endpoint}/{bucket}/{key}`.
    ///
    /// # Default
    ///
    /// `http://localhost:9000`
    ///
    /// # Environment Variable
    ///
    /// `SB__OBJECT_STORE__ENDPOINT`
    pub endpoint: String,

    /// Bearer token sent with every object store request.
    ///
    /// # Default
    ///
    /// `None` (requests are sent without authentication)
    ///
    /// # Environment Variable
    ///
    /// `SB__OBJECT_STORE__TOKEN`
    pub token: Option<String>,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".into(),
            token: None,
        }
    }
}

/// [Sentry](https://sentry.io/) error reporting configuration.
///
/// Used in: [`Config::sentry`]
#[derive(Debug, Deserialize, Serialize)]
pub struct Sentry {
    /// Sentry DSN (Data Source Name).
    ///
    /// When set, errors and logs are reported to Sentry.
    ///
    /// # Default
    ///
    /// `None` (Sentry disabled)
    ///
    /// # Environment Variable
    ///
    /// `SB__SENTRY__DSN`
    pub dsn: Option<String>,

    /// Environment name reported with every event, such as `production`.
    ///
    /// # Environment Variable
    ///
    /// `SB__SENTRY__ENVIRONMENT`
    pub environment: Option<String>,

    /// Error event sample rate between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `1.0`
    ///
    /// # Environment Variable
    ///
    /// `SB__SENTRY__SAMPLE_RATE`
    pub sample_rate: f32,

    /// Performance tracing sample rate between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `0.01`
    ///
    /// # Environment Variable
    ///
    /// `SB__SENTRY__TRACES_SAMPLE_RATE`
    pub traces_sample_rate: f32,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    ///
    /// Sentry is considered enabled if a DSN is configured.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.01,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// Valid levels in increasing severity: TRACE, DEBUG, INFO, WARN, ERROR, OFF. The `RUST_LOG`
    /// environment variable provides more granular control per module if needed.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `SB__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format. See [`LogFormat`] for available options.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `SB__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the storagebench host.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Socket address the HTTP host binds to.
    ///
    /// # Default
    ///
    /// `0.0.0.0:8080`
    ///
    /// # Environment Variable
    ///
    /// `SB__HTTP_ADDR`
    pub http_addr: SocketAddr,

    /// Whether invocations measure one backend or both side by side.
    ///
    /// # Default
    ///
    /// `unified`
    ///
    /// # Environment Variable
    ///
    /// `SB__MODE`
    pub mode: BenchmarkMode,

    /// Directory the shared filesystem is mounted at.
    ///
    /// Required when `vpc_stack_name` is set or in dual mode. Also used as key prefix in the
    /// object store.
    ///
    /// # Environment Variable
    ///
    /// `SB__MOUNT_PATH`
    pub mount_path: Option<PathBuf>,

    /// Object store bucket.
    ///
    /// Required whenever the object store is used.
    ///
    /// # Environment Variable
    ///
    /// `SB__BUCKET`
    pub bucket: String,

    /// Name of the VPC stack this deployment runs in.
    ///
    /// Its presence switches unified mode to the mounted filesystem. An empty value counts as
    /// unset.
    ///
    /// # Environment Variable
    ///
    /// `SB__VPC_STACK_NAME`
    pub vpc_stack_name: Option<String>,

    /// Number of times every object is read back.
    ///
    /// # Default
    ///
    /// `1`
    ///
    /// # Environment Variable
    ///
    /// `SB__READ_ITERATIONS`
    pub read_iterations: u32,

    /// Serve repeated reads of the same object from the local cache.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `SB__READ_FROM_CACHE`
    pub read_from_cache: bool,

    /// Path of the local scratch file backing the cache.
    ///
    /// # Default
    ///
    /// `/tmp/storagebench-cache`
    ///
    /// # Environment Variable
    ///
    /// `SB__CACHE_PATH`
    pub cache_path: PathBuf,

    /// Object store connection settings. See [`ObjectStore`].
    pub object_store: ObjectStore,

    /// Logging configuration. See [`Logging`].
    pub logging: Logging,

    /// Sentry error reporting. See [`Sentry`].
    pub sentry: Sentry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),

            mode: BenchmarkMode::default(),
            mount_path: None,
            bucket: String::new(),
            vpc_stack_name: None,
            read_iterations: 1,
            read_from_cache: false,
            cache_path: PathBuf::from("/tmp/storagebench-cache"),

            object_store: ObjectStore::default(),
            logging: Logging::default(),
            sentry: Sentry::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided)
    /// 3. Environment variables (prefixed with `SB__`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    /// - The resulting configuration is inconsistent, see [`validate`](Self::validate)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that the selected backends have everything they need.
    pub fn validate(&self) -> Result<()> {
        if self.read_iterations == 0 {
            anyhow::bail!("read_iterations must be at least 1");
        }

        let uses_mounted_fs = self.mode == BenchmarkMode::Dual || self.vpc_stack_name().is_some();
        let uses_object_store =
            self.mode == BenchmarkMode::Dual || self.vpc_stack_name().is_none();

        if uses_mounted_fs && self.mount_path.is_none() {
            anyhow::bail!("mount_path is required to use the mounted filesystem");
        }
        if uses_object_store && self.bucket.is_empty() {
            anyhow::bail!("bucket is required to use the object store");
        }

        Ok(())
    }

    fn vpc_stack_name(&self) -> Option<&str> {
        self.vpc_stack_name.as_deref().filter(|name| !name.is_empty())
    }

    /// The harness settings derived from this configuration.
    pub fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            mode: self.mode,
            mount_path: self.mount_path.clone(),
            bucket: self.bucket.clone(),
            vpc_stack_name: self.vpc_stack_name().map(Into::into),
            read_iterations: NonZeroU32::new(self.read_iterations).unwrap_or(NonZeroU32::MIN),
            read_from_cache: self.read_from_cache,
        }
    }

    pub fn object_store_config(&self) -> ObjectStoreConfig<'_> {
        ObjectStoreConfig {
            endpoint: &self.object_store.endpoint,
            token: self.object_store.token.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SB__MOUNT_PATH", "/mnt/efs");
            jail.set_env("SB__BUCKET", "whatever");
            jail.set_env("SB__READ_ITERATIONS", "3");
            jail.set_env("SB__READ_FROM_CACHE", "true");
            jail.set_env("SB__OBJECT_STORE__ENDPOINT", "http://localhost:8888");
            jail.set_env("SB__SENTRY__DSN", "abcde");
            jail.set_env("SB__SENTRY__SAMPLE_RATE", "0.5");

            let config = Config::load(None).unwrap();

            assert_eq!(dbg!(&config).mount_path, Some(PathBuf::from("/mnt/efs")));
            assert_eq!(config.bucket, "whatever");
            assert_eq!(config.read_iterations, 3);
            assert!(config.read_from_cache);
            assert_eq!(config.object_store.endpoint, "http://localhost:8888");
            assert_eq!(config.sentry.dsn.as_deref(), Some("abcde"));
            assert_eq!(config.sentry.sample_rate, 0.5);

            let bench = config.bench_config();
            assert_eq!(bench.read_iterations.get(), 3);
            assert!(!bench.uses_mounted_fs());

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            mode: dual
            mount_path: /mnt/efs
            bucket: whatever
            logging:
                level: debug
                format: json
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(dbg!(&config).mode, BenchmarkMode::Dual);
            assert_eq!(config.bucket, "whatever");
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            bucket: whatever
            read_iterations: 2
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("SB__READ_ITERATIONS", "5");

            let config = Config::load(Some(tempfile.path())).unwrap();

            // Env should overwrite the yaml config
            assert_eq!(config.read_iterations, 5);
            assert_eq!(config.bucket, "whatever");

            Ok(())
        });
    }

    #[test]
    fn vpc_requires_mount_path() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SB__VPC_STACK_NAME", "stack");

            assert!(Config::load(None).is_err());

            jail.set_env("SB__MOUNT_PATH", "/mnt/efs");
            let config = Config::load(None).unwrap();
            assert!(config.bench_config().uses_mounted_fs());

            Ok(())
        });
    }

    #[test]
    fn empty_vpc_stack_name_is_unset() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SB__VPC_STACK_NAME", "");
            jail.set_env("SB__BUCKET", "whatever");

            let config = Config::load(None).unwrap();
            assert!(!config.bench_config().uses_mounted_fs());

            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_configs() {
        // No bucket for the object store.
        assert!(Config::default().validate().is_err());

        let config = Config {
            bucket: "whatever".into(),
            read_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            bucket: "whatever".into(),
            mode: BenchmarkMode::Dual,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
