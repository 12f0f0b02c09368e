//! HTTP JSON-RPC adapter for the rewards backend.

use async_trait::async_trait;
use edumine_mining::{
    BackendError, ClaimReceipt, MiningBackend, MiningSession, MiningTotals, SESSION_DURATION,
};
use edumine_types::{CoinAmount, Timestamp};
use edumine_utils::format_duration;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::ClientError;

/// HTTP client for the rewards backend.
///
/// Every call is a POST of a JSON object carrying an `action` field and the
/// user id; the backend answers `{ "result": ... }` or `{ "error": "..." }`.
#[derive(Clone)]
pub struct RpcBackend {
    http: reqwest::Client,
    backend_url: String,
    user_id: String,
    access_token: Option<String>,
}

impl RpcBackend {
    /// Create a backend client with default timeouts (30 s request, 10 s connect).
    pub fn new(
        backend_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, BackendError> {
        Self::with_timeouts(
            backend_url,
            user_id,
            Duration::from_secs(30),
            Duration::from_secs(10),
        )
    }

    pub fn with_timeouts(
        backend_url: impl Into<String>,
        user_id: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            backend_url: backend_url.into(),
            user_id: user_id.into(),
            access_token: None,
        })
    }

    /// Build from a validated [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let backend = Self::with_timeouts(
            config.backend_url.clone(),
            config.user_id.clone(),
            config.request_timeout(),
            config.connect_timeout(),
        )?;
        Ok(match &config.access_token {
            Some(token) => backend.with_access_token(token.clone()),
            None => backend,
        })
    }

    /// Attach the bearer token issued by the auth provider.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Send an RPC request and return its `result` field.
    async fn rpc_call(&self, action: &str) -> Result<serde_json::Value, BackendError> {
        let body = request_body(action, &self.user_id);

        let mut request = self.http.post(&self.backend_url).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(action, url = %self.backend_url, "backend request");
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("{action}: {e}")))?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(format!("{action}: invalid JSON: {e}")))?;

        unwrap_result(json)
    }
}

#[async_trait]
impl MiningBackend for RpcBackend {
    async fn fetch_snapshot(&self) -> Result<MiningSession, BackendError> {
        let result = self.rpc_call("mining_session").await?;
        let wire: SessionWire = serde_json::from_value(result)
            .map_err(|e| BackendError::Decode(format!("mining_session: {e}")))?;
        wire.into_session()
    }

    async fn request_start(&self) -> Result<(), BackendError> {
        self.rpc_call("mining_start").await?;
        Ok(())
    }

    async fn request_claim(&self) -> Result<ClaimReceipt, BackendError> {
        let result = self.rpc_call("mining_claim").await?;
        decode_claim(&result)
    }

    async fn fetch_totals(&self) -> Result<MiningTotals, BackendError> {
        let result = self.rpc_call("mining_totals").await?;
        let wire: TotalsWire = serde_json::from_value(result)
            .map_err(|e| BackendError::Decode(format!("mining_totals: {e}")))?;
        wire.into_totals()
    }

    fn name(&self) -> &str {
        "rpc"
    }
}

fn request_body(action: &str, user_id: &str) -> serde_json::Value {
    serde_json::json!({ "action": action, "user_id": user_id })
}

/// Pull `result` out of a response, turning an `error` field into a rejection.
fn unwrap_result(json: serde_json::Value) -> Result<serde_json::Value, BackendError> {
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err
            .as_str()
            .map(str::to_string)
            .or_else(|| err.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| err.to_string());
        return Err(BackendError::Rejected(message));
    }
    match json.get("result") {
        Some(result) => Ok(result.clone()),
        None => Ok(json),
    }
}

/// Session snapshot as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionWire {
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    pub reward_total: f64,
}

impl SessionWire {
    /// Parse timestamps and amounts, rejecting snapshots that break the session shape.
    pub fn into_session(self) -> Result<MiningSession, BackendError> {
        let parse = |field: &str, raw: Option<String>| -> Result<Option<Timestamp>, BackendError> {
            raw.map(|s| {
                Timestamp::parse_rfc3339(&s)
                    .map_err(|e| BackendError::MalformedSnapshot(format!("{field}: {e}")))
            })
            .transpose()
        };

        let session = MiningSession {
            started_at: parse("started_at", self.started_at)?,
            ends_at: parse("ends_at", self.ends_at)?,
            reward_total: CoinAmount::from_decimal(self.reward_total)
                .map_err(|e| BackendError::MalformedSnapshot(format!("reward_total: {e}")))?,
        };
        session
            .check_invariants()
            .map_err(BackendError::MalformedSnapshot)?;

        if let Some(span) = session.span() {
            if span != SESSION_DURATION {
                tracing::warn!(
                    span = %format_duration(span),
                    expected = %format_duration(SESSION_DURATION),
                    "backend session length differs from the usual duration"
                );
            }
        }
        Ok(session)
    }
}

/// Lifetime totals as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TotalsWire {
    #[serde(default)]
    pub today_mined: f64,
    #[serde(default)]
    pub total_mined: f64,
}

impl TotalsWire {
    pub fn into_totals(self) -> Result<MiningTotals, BackendError> {
        let amount = |field: &str, value: f64| {
            CoinAmount::from_decimal(value)
                .map_err(|e| BackendError::Decode(format!("{field}: {e}")))
        };
        Ok(MiningTotals {
            today_mined: amount("today_mined", self.today_mined)?,
            total_mined: amount("total_mined", self.total_mined)?,
        })
    }
}

/// A claim result is either a bare number or `{ "claimed": number }`.
fn decode_claim(result: &serde_json::Value) -> Result<ClaimReceipt, BackendError> {
    let claimed = result
        .as_f64()
        .or_else(|| result.get("claimed").and_then(|c| c.as_f64()))
        .ok_or_else(|| BackendError::Decode(format!("mining_claim: unexpected result {result}")))?;
    let claimed = CoinAmount::from_decimal(claimed)
        .map_err(|e| BackendError::Decode(format!("mining_claim: {e}")))?;
    Ok(ClaimReceipt { claimed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_from(value: serde_json::Value) -> Result<MiningSession, BackendError> {
        let wire: SessionWire = serde_json::from_value(value).unwrap();
        wire.into_session()
    }

    #[test]
    fn decodes_active_session() {
        let session = session_from(json!({
            "started_at": "2024-05-01T08:00:00Z",
            "ends_at": "2024-05-01T20:00:00Z",
            "reward_total": 120
        }))
        .unwrap();
        assert_eq!(session.reward_total, CoinAmount::from_coins(120));
        assert_eq!(session.span(), Some(SESSION_DURATION));
    }

    #[test]
    fn decodes_idle_session_with_nulls_or_missing_fields() {
        let with_nulls = session_from(json!({
            "started_at": null,
            "ends_at": null,
            "reward_total": 50.5
        }))
        .unwrap();
        assert_eq!(with_nulls.started_at, None);
        assert_eq!(with_nulls.reward_total, CoinAmount::from_decimal(50.5).unwrap());

        let missing = session_from(json!({ "reward_total": 0 })).unwrap();
        assert_eq!(missing, MiningSession::idle(CoinAmount::ZERO));
    }

    #[test]
    fn decodes_timestamps_without_offset_as_utc() {
        let naive = session_from(json!({
            "started_at": "2024-05-01T08:00:00",
            "ends_at": "2024-05-01T20:00:00",
            "reward_total": 120
        }))
        .unwrap();
        let zoned = session_from(json!({
            "started_at": "2024-05-01T08:00:00Z",
            "ends_at": "2024-05-01T20:00:00Z",
            "reward_total": 120
        }))
        .unwrap();
        assert_eq!(naive, zoned);
        assert_eq!(naive.span(), Some(SESSION_DURATION));
    }

    #[test]
    fn rejects_half_present_pair() {
        let err = session_from(json!({
            "started_at": "2024-05-01T08:00:00Z",
            "ends_at": null,
            "reward_total": 10
        }))
        .unwrap_err();
        assert!(matches!(err, BackendError::MalformedSnapshot(_)));
    }

    #[test]
    fn rejects_end_before_start_and_bad_values() {
        let inverted = session_from(json!({
            "started_at": "2024-05-01T08:00:00Z",
            "ends_at": "2024-05-01T07:00:00Z",
            "reward_total": 10
        }));
        assert!(matches!(inverted, Err(BackendError::MalformedSnapshot(_))));

        let bad_time = session_from(json!({
            "started_at": "soon",
            "ends_at": "2024-05-01T07:00:00Z",
            "reward_total": 10
        }));
        assert!(matches!(bad_time, Err(BackendError::MalformedSnapshot(_))));

        let negative = session_from(json!({ "reward_total": -1 }));
        assert!(matches!(negative, Err(BackendError::MalformedSnapshot(_))));
    }

    #[test]
    fn claim_result_accepts_number_or_object() {
        assert_eq!(
            decode_claim(&json!(120)).unwrap().claimed,
            CoinAmount::from_coins(120)
        );
        assert_eq!(
            decode_claim(&json!({ "claimed": 2.5 })).unwrap().claimed,
            CoinAmount::from_decimal(2.5).unwrap()
        );
        assert!(decode_claim(&json!("lots")).is_err());
    }

    #[test]
    fn totals_default_missing_fields_to_zero() {
        let wire: TotalsWire = serde_json::from_value(json!({ "total_mined": 360 })).unwrap();
        let totals = wire.into_totals().unwrap();
        assert_eq!(totals.today_mined, CoinAmount::ZERO);
        assert_eq!(totals.total_mined, CoinAmount::from_coins(360));
    }

    #[test]
    fn error_bodies_become_rejections() {
        let err = unwrap_result(json!({ "error": "session already running" })).unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "session already running"));

        let err = unwrap_result(json!({ "error": { "message": "not found" } })).unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "not found"));

        let ok = unwrap_result(json!({ "result": { "a": 1 }, "error": null })).unwrap();
        assert_eq!(ok, json!({ "a": 1 }));
    }

    #[test]
    fn bare_response_is_its_own_result() {
        let ok = unwrap_result(json!({ "reward_total": 3 })).unwrap();
        assert_eq!(ok["reward_total"], 3);
    }

    #[test]
    fn request_body_carries_action_and_user() {
        let body = request_body("mining_start", "u-7");
        assert_eq!(body, json!({ "action": "mining_start", "user_id": "u-7" }));
    }

    #[test]
    fn client_creation_from_config() {
        let config = ClientConfig {
            user_id: "u-1".into(),
            access_token: Some("t".into()),
            ..Default::default()
        };
        let backend = RpcBackend::from_config(&config).unwrap();
        assert_eq!(backend.backend_url(), "http://127.0.0.1:8787/rpc");
        assert_eq!(backend.user_id(), "u-1");
        assert_eq!(backend.name(), "rpc");

        assert!(RpcBackend::from_config(&ClientConfig::default()).is_err());
    }
}
