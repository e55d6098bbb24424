use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Slack `oauth.v2.access` response.
///
/// Slack reports failure in-band: `ok=false` plus an `error` code, with the
/// token fields omitted, so everything past `ok` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessData {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub team: Option<TeamInfo>,
}

/// Workspace the app was installed into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Stored per-workspace bot token. The token is encrypted at rest.
#[derive(Debug, Clone, FromRow)]
pub struct WorkspaceToken {
    pub team_id: String,
    pub team_name: Option<String>,
    pub access_token: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
