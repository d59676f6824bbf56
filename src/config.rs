use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, EtlResult};

pub const DEFAULT_PROJECT_KEY: &str = "Gestão de Atividades";

pub const ENV_SERVER: &str = "JIRA_SERVER";
pub const ENV_EMAIL: &str = "JIRA_EMAIL";
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";
pub const ENV_BOARD_ID: &str = "JIRA_BOARD_ID";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub jira: Option<JiraConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct JiraConfig {
    pub server: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub board_id: Option<String>,
    pub project_key: Option<String>,
}

/// Connection values passed explicitly by the caller. Anything left as
/// `None` falls back to the environment and then to the config file.
#[derive(Debug, Default, Clone)]
pub struct ConnectionOverrides {
    pub server: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub board_id: Option<String>,
    pub project_key: Option<String>,
}

impl ConnectionOverrides {
    fn is_complete(&self) -> bool {
        self.server.is_some()
            && self.email.is_some()
            && self.api_token.is_some()
            && self.board_id.is_some()
    }
}

#[derive(Clone)]
pub struct ConnectionSettings {
    pub server: String,
    pub email: String,
    pub api_token: String,
    pub board_id: String,
    pub project_key: String,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("server", &self.server)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("board_id", &self.board_id)
            .field("project_key", &self.project_key)
            .finish()
    }
}

impl ConnectionSettings {
    /// Resolve the four required connection values. Explicit overrides win;
    /// when any is missing, `.env` is loaded and the process environment and
    /// `~/.jira-extract/config.toml` are consulted in that order.
    pub fn resolve(overrides: ConnectionOverrides) -> EtlResult<Self> {
        if overrides.is_complete() {
            return Self::resolve_with(overrides, |_| None, &AppConfig::default());
        }

        dotenvy::dotenv().ok();
        let file = load_config()?;
        Self::resolve_with(overrides, |key| std::env::var(key).ok(), &file)
    }

    fn resolve_with(
        overrides: ConnectionOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: &AppConfig,
    ) -> EtlResult<Self> {
        let jira = file.jira.as_ref();
        let pick = |explicit: Option<String>, key: &str, from_file: Option<&String>| {
            non_empty(explicit)
                .or_else(|| non_empty(env(key)))
                .or_else(|| non_empty(from_file.cloned()))
        };

        let server = pick(overrides.server, ENV_SERVER, jira.and_then(|j| j.server.as_ref()));
        let email = pick(overrides.email, ENV_EMAIL, jira.and_then(|j| j.email.as_ref()));
        let api_token = pick(
            overrides.api_token,
            ENV_API_TOKEN,
            jira.and_then(|j| j.api_token.as_ref()),
        );
        let board_id = pick(
            overrides.board_id,
            ENV_BOARD_ID,
            jira.and_then(|j| j.board_id.as_ref()),
        );

        let mut missing = Vec::new();
        if server.is_none() {
            missing.push(ENV_SERVER);
        }
        if email.is_none() {
            missing.push(ENV_EMAIL);
        }
        if api_token.is_none() {
            missing.push(ENV_API_TOKEN);
        }
        if board_id.is_none() {
            missing.push(ENV_BOARD_ID);
        }

        match (server, email, api_token, board_id) {
            (Some(server), Some(email), Some(api_token), Some(board_id)) => Ok(Self {
                server,
                email,
                api_token,
                board_id,
                project_key: non_empty(overrides.project_key)
                    .or_else(|| non_empty(jira.and_then(|j| j.project_key.clone())))
                    .unwrap_or_else(|| DEFAULT_PROJECT_KEY.to_string()),
            }),
            _ => Err(EtlError::Configuration { missing }),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jira-extract")
        .join("config.toml")
}

pub fn load_config() -> EtlResult<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> EtlResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EtlError::from_io(path, e))?;
    toml::from_str(&contents).map_err(|e| EtlError::ConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
