/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

use crate::cli_args::Opt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;
use videocall_sfu_client::{SessionOptions, DEFAULT_REQUEST_TIMEOUT_MS};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProbeConfig {
    pub server_url: String,
    pub participant_id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub consume: bool,
    pub duration_secs: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

impl ProbeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: ProbeConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn from_env_or_default() -> anyhow::Result<Self> {
        if let Ok(config_path) = std::env::var("PROBE_CONFIG_PATH") {
            return Self::from_file(Path::new(&config_path));
        }

        let server_url =
            std::env::var("SERVER_URL").unwrap_or_else(|_| "ws://localhost:3000/ws".to_string());
        let participant_id = std::env::var("PARTICIPANT_ID")
            .unwrap_or_else(|_| format!("probe-{}", std::process::id()));
        let consume = std::env::var("CONSUME")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);
        let request_timeout_ms = std::env::var("REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());

        Ok(ProbeConfig {
            server_url,
            participant_id,
            display_name: std::env::var("DISPLAY_NAME").ok(),
            consume,
            duration_secs: None,
            request_timeout_ms,
        })
    }

    /// Load from `--config` if given, otherwise as `from_env_or_default`,
    /// then apply the remaining command line flags on top.
    pub fn load(opt: &Opt) -> anyhow::Result<Self> {
        let mut config = match &opt.config {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env_or_default()?,
        };
        config.apply(opt);
        Ok(config)
    }

    pub fn apply(&mut self, opt: &Opt) {
        if let Some(url) = &opt.url {
            self.server_url = url.to_string();
        }
        if let Some(participant_id) = &opt.participant_id {
            self.participant_id = participant_id.clone();
        }
        if opt.display_name.is_some() {
            self.display_name = opt.display_name.clone();
        }
        if opt.consume {
            self.consume = true;
        }
        if opt.duration_secs.is_some() {
            self.duration_secs = opt.duration_secs;
        }
        if opt.request_timeout_ms.is_some() {
            self.request_timeout_ms = opt.request_timeout_ms;
        }
    }

    pub fn server_url(&self) -> anyhow::Result<Url> {
        let url =
            Url::parse(&self.server_url).map_err(|e| anyhow::anyhow!("Invalid server URL: {e:?}"))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => anyhow::bail!("Signaling URL must be ws:// or wss://, got {other}://"),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new(self.participant_id.clone());
        options.display_name = self.display_name.clone();
        options.request_timeout_ms = self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        options
    }
}
