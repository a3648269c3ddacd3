use anyhow::{Context, bail};
use log::LevelFilter;

use super::structure::ChatBotConfigInner;
use std::{
    ops::{Deref, DerefMut},
    path::PathBuf,
    str::FromStr,
};

#[derive(Debug, Clone)]
pub struct ChatBotConfig {
    pub path: PathBuf,
    cached: ChatBotConfigInner,
}

impl ChatBotConfig {
    /// Reads the config file, applies the process environment on top and validates the result.
    pub fn load(path: PathBuf) -> Result<Self, anyhow::Error> {
        let mut config = Self::read(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn read(path: PathBuf) -> Result<Self, anyhow::Error> {
        let path = match path.is_dir() {
            true => path.join("config.toml"),
            false => path,
        };

        // no file is fine, everything can come from the environment
        if !path.exists() {
            return Ok(Self {
                path,
                cached: ChatBotConfigInner::default(),
            });
        }

        if !path.is_file() {
            bail!(
                "Given path exists and is not a file... either change the path or delete the file."
            );
        }

        let config_str = std::fs::read_to_string(&path)?;

        Ok(Self {
            cached: toml::from_str(&config_str)
                .with_context(|| format!("could not parse {}", path.display()))?,
            path,
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = lookup("LLM_API_BASE_URL") {
            self.cached.llm.base_url = Some(base_url);
        }
        if let Some(api_key) = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.cached.llm.api_key = Some(api_key);
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            self.cached.llm.model = model;
        }
        if let Some(streaming) = lookup("LLM_STREAMING") {
            self.cached.llm.streaming = parse_toggle(&streaming)
                .with_context(|| format!("LLM_STREAMING has an invalid value \"{streaming}\""))?;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS") {
            self.cached.llm.max_tokens = max_tokens
                .trim()
                .parse()
                .with_context(|| format!("LLM_MAX_TOKENS is not a number: \"{max_tokens}\""))?;
        }
        if let Some(host) = lookup("HOST") {
            self.cached.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.cached.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: \"{port}\""))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.cached.log.level = Some(level);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.cached.llm.base_url.as_deref().map(str::trim) {
            None | Some("") => bail!("LLM_API_BASE_URL is not set!"),
            Some(_) => (),
        }

        if self.cached.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than zero");
        }

        if let Some(level) = &self.cached.log.level {
            LevelFilter::from_str(level)
                .with_context(|| format!("unknown log level \"{level}\""))?;
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<LevelFilter> {
        self.cached
            .log
            .level
            .as_deref()
            .and_then(|level| LevelFilter::from_str(level).ok())
    }
}

fn parse_toggle(value: &str) -> Result<bool, anyhow::Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => bail!("expected one of 1/0, true/false, on/off, yes/no"),
    }
}

impl From<ChatBotConfigInner> for ChatBotConfig {
    fn from(cached: ChatBotConfigInner) -> Self {
        Self {
            path: PathBuf::from("config.toml"),
            cached,
        }
    }
}

impl Deref for ChatBotConfig {
    type Target = ChatBotConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.cached
    }
}

impl DerefMut for ChatBotConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cached
    }
}
