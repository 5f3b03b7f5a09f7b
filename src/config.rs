use crate::engine::Backend;
use crate::engines::cloud::DEFAULT_ENDPOINT;
use crate::GlobalArgs;
use anyhow::bail;
use std::path::PathBuf;

/// Environment variables are named `WQH_<FLAG>`
pub const ENV_PREFIX: &str = "WQH";

pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Resolves a flag from the command line first, then from the environment
///
/// The environment is only consulted when the flag was not given explicitly.
/// The lookup is injectable so tests do not touch the process environment.
pub struct Resolver<F> {
    lookup: F,
}

/// Resolver backed by the process environment
pub fn env_resolver() -> Resolver<impl Fn(&str) -> Option<String>> {
    Resolver::new(|key: &str| std::env::var(key).ok())
}

/// `api-key` -> `WQH_API_KEY`
pub fn env_key(flag: &str) -> String {
    format!("{}_{}", ENV_PREFIX, flag.to_uppercase().replace('-', "_"))
}

impl<F> Resolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    fn env(&self, flag: &str) -> Option<String> {
        let key = env_key(flag);
        let value = (self.lookup)(&key).filter(|v| !v.is_empty());
        if value.is_some() {
            tracing::debug!(flag, env = %key, "Flag taken from environment");
        }
        value
    }

    pub fn string(&self, flag: &str, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.env(flag))
    }

    pub fn path(&self, flag: &str, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| self.env(flag).map(PathBuf::from))
    }

    /// Boolean switch, `false` when neither source sets it
    pub fn switch(&self, flag: &str, explicit: Option<bool>) -> anyhow::Result<bool> {
        if let Some(value) = explicit {
            return Ok(value);
        }
        match self.env(flag) {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow::anyhow!("invalid boolean {:?} in {}", raw, env_key(flag))),
            None => Ok(false),
        }
    }
}

/// Accepts the spellings `1 t T TRUE true True` and their false counterparts
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Cloud Vision settings
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Local engine settings
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "engine-tesseract"), allow(dead_code))]
pub struct LocalConfig {
    /// Tessdata directory; downloaded to the cache dir when unset
    pub tessdata_path: Option<PathBuf>,
    pub language: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            tessdata_path: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Settings for one invocation
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub cloud: CloudConfig,
    pub local: LocalConfig,
}

impl Config {
    /// Explicit arguments > environment > defaults
    pub fn resolve<F>(args: &GlobalArgs, resolver: &Resolver<F>) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_tesseract = resolver.switch("tesseract", args.tesseract)?;

        let endpoint = resolver
            .string("endpoint", args.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if endpoint.trim().is_empty() {
            bail!("--endpoint must not be empty");
        }

        Ok(Self {
            backend: Backend::from_tesseract_flag(use_tesseract),
            cloud: CloudConfig {
                api_key: resolver.string("api-key", args.api_key.clone()),
                endpoint,
            },
            local: LocalConfig {
                tessdata_path: resolver.path("tessdata", args.tessdata.clone()),
                language: resolver
                    .string("language", args.language.clone())
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            },
        })
    }
}

/// Log filter directive, resolved ahead of `Config` so the subscriber is up
/// before any other flag is read
pub fn log_level<F>(args: &GlobalArgs, resolver: &Resolver<F>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    resolver
        .string("log-level", args.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
