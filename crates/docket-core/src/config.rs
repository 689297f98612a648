use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Directory holding project state, relative to the project root.
pub const DOCKET_DIR: &str = ".docket";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub last_call: LastCallConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub telechat: TelechatConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCallConfig {
    #[serde(default = "default_last_call_days")]
    pub days: u32,
    /// Added for individual submissions and area-sponsored documents.
    #[serde(default = "default_last_call_days")]
    pub individual_extra_days: u32,
}

impl Default for LastCallConfig {
    fn default() -> Self {
        Self {
            days: default_last_call_days(),
            individual_extra_days: default_last_call_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_iesg_address")]
    pub iesg: String,
    #[serde(default = "default_secretariat_address")]
    pub secretariat: String,
    #[serde(default = "default_announce_address")]
    pub announce: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            iesg: default_iesg_address(),
            secretariat: default_secretariat_address(),
            announce: default_announce_address(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelechatConfig {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    #[serde(default = "default_ballot_body")]
    pub ballot_body: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

#[must_use]
pub fn database_path(project_root: &Path) -> PathBuf {
    project_root.join(DOCKET_DIR).join("docket.sqlite3")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(DOCKET_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("docket/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("DOCKET_FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<String>, env_format: Option<String>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

/// Starter config written by `dk init`.
pub const STARTER_CONFIG: &str = r#"# docket project configuration

[last_call]
days = 14
individual_extra_days = 14

[mail]
iesg = "iesg@ietf.org"
secretariat = "iesg-secretary@ietf.org"
announce = "ietf-announce@ietf.org"

[telechat]
dates = []

# [[roster.members]]
# ballot_body = "iesg"
# id = "ad1"
# name = "Ada Example"
"#;

const fn default_last_call_days() -> u32 {
    14
}

fn default_iesg_address() -> String {
    "iesg@ietf.org".to_string()
}

fn default_secretariat_address() -> String {
    "iesg-secretary@ietf.org".to_string()
}

fn default_announce_address() -> String {
    "ietf-announce@ietf.org".to_string()
}

fn default_ballot_body() -> String {
    "iesg".to_string()
}
