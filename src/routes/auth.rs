use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{db, models::AccessData, AppState};

const SLACK_OAUTH_ACCESS_URL: &str = "https://slack.com/api/oauth.v2.access";

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub code: String,
}

/// Slack OAuth redirect target for workspace installs.
///
/// Exchanges the authorization code for a bot token and stores it for the
/// workspace. Board lifecycle is untouched here; boards come into existence
/// lazily when a channel first uses the bot.
pub async fn install(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InstallQuery>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    let access_data = exchange_code_with_slack(&state, &query.code)
        .await
        .map_err(|e| {
            tracing::error!("Failed to exchange code with Slack: {}", e);
            something_went_wrong()
        })?;

    let (Some(access_token), Some(team)) = (&access_data.access_token, &access_data.team) else {
        tracing::error!("Slack token response missing access_token or team");
        return Err(something_went_wrong());
    };

    db::queries::save_workspace_token(
        &state.db,
        &team.id,
        team.name.as_deref(),
        access_token,
        &state.config.security.encryption_key,
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to save workspace token: {}", e);
        something_went_wrong()
    })?;

    tracing::info!(
        "App installed into workspace {} ({})",
        team.name.as_deref().unwrap_or("unknown"),
        team.id
    );

    Ok("App is successfully installed!")
}

/// Exchange an authorization code with Slack's OAuth v2 API.
async fn exchange_code_with_slack(state: &AppState, code: &str) -> anyhow::Result<AccessData> {
    let params = [
        ("client_id", state.config.slack.client_id.as_str()),
        ("client_secret", state.config.slack.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", state.config.slack.redirect_uri.as_str()),
    ];

    let response = state
        .http_client
        .post(SLACK_OAUTH_ACCESS_URL)
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        tracing::error!("Slack token exchange failed: {} - {}", status, error_text);
        anyhow::bail!("Slack token exchange failed with status {}", status);
    }

    // Slack signals failure with ok=false in an HTTP 200 response
    let access_data = response.json::<AccessData>().await?;
    if !access_data.ok {
        anyhow::bail!(
            "Slack rejected the authorization code: {}",
            access_data.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(access_data)
}

fn something_went_wrong() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "Something went wrong")
}
