use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::Path};

/// Boosted-tree hyperparameters.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub iterations: usize,
    pub max_depth: u32,
    /// Learning rate.
    pub shrinkage: f32,
    /// Sample weight applied to delayed (label 1) rows during fit.
    pub scale_pos_weight: f32,
    /// Positive-class probability at or above which a row is labelled 1.
    pub threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 6,
            shrinkage: 0.01,
            scale_pos_weight: 19.0,
            threshold: 0.5,
        }
    }
}

impl ClassifierConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read model config at {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&data)
            .with_context(|| format!("invalid model config JSON in {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.iterations > 0, "iterations must be at least 1");
        ensure!(self.max_depth > 0, "max_depth must be at least 1");
        ensure!(self.shrinkage > 0.0, "shrinkage must be positive");
        ensure!(self.scale_pos_weight > 0.0, "scale_pos_weight must be positive");
        ensure!(
            self.threshold > 0.0 && self.threshold < 1.0,
            "threshold must lie in (0, 1)"
        );
        Ok(())
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `LOG_PRED=1` logs per-request feature diagnostics.
    pub log_pred: bool,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT '{}'", p))?,
            None => 8080,
        };
        let log_pred = get("LOG_PRED").as_deref() == Some("1");
        let classifier = match get("MODEL_CONFIG") {
            Some(path) => ClassifierConfig::load(path)?,
            None => ClassifierConfig::default(),
        };
        Ok(Self {
            bind_addr,
            port,
            log_pred,
            classifier,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.bind_addr, self.port))
    }
}
