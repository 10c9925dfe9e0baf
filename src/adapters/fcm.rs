use crate::config::Credentials;
use crate::error::GatewayError;
use crate::ports::gateway::PushGateway;
use crate::types::delivery::{AddressOutcome, BatchReport, PushMessage};

use futures::FutureExt;
use futures::future::BoxFuture;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, RS256KeyPair, RSAKeyPairLike};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const API_BASE: &str = "https://fcm.googleapis.com";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize, Deserialize)]
struct ScopeClaims {
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Firebase Cloud Messaging HTTP v1 client authenticated with a service
/// account. One `messages:send` request is issued per address.
#[derive(Clone)]
pub struct FcmGateway {
    project_id: String,
    client_email: String,
    key_pair: Arc<RS256KeyPair>,
    client: reqwest::Client,
    token_uri: String,
    api_base: String,
    token: Arc<tokio::sync::Mutex<Option<CachedToken>>>,
}

impl FcmGateway {
    pub fn new(credentials: &Credentials) -> Result<Self, GatewayError> {
        let key_pair = parse_private_key(&credentials.private_key)?;
        Self::with_endpoints(credentials, key_pair, TOKEN_URI, API_BASE)
    }

    pub(crate) fn with_endpoints(
        credentials: &Credentials,
        key_pair: RS256KeyPair,
        token_uri: &str,
        api_base: &str,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            project_id: credentials.project_id.clone(),
            client_email: credentials.client_email.clone(),
            key_pair: Arc::new(key_pair),
            client,
            token_uri: token_uri.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let claims = Claims::with_custom_claims(
            ScopeClaims {
                scope: MESSAGING_SCOPE.to_string(),
            },
            JwtDuration::from_hours(1),
        )
        .with_issuer(&self.client_email)
        .with_audience(&self.token_uri);
        let assertion = self
            .key_pair
            .sign(claims)
            .map_err(|err| GatewayError::Credentials(err.to_string()))?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(format!("{status}: {body}")));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Auth(format!("invalid token response: {err}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn send_one(&self, access_token: &str, message: &PushMessage, address: &str) -> AddressOutcome {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base, self.project_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&message_body(message, address))
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => AddressOutcome::delivered(address),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                AddressOutcome::rejected(address, format!("{status}: {}", body.trim()))
            }
            Err(err) => AddressOutcome::rejected(address, err.to_string()),
        }
    }
}

impl PushGateway for FcmGateway {
    fn send_batch<'a>(
        &'a self,
        message: &'a PushMessage,
        targets: &'a [String],
    ) -> BoxFuture<'a, Result<BatchReport, GatewayError>> {
        async move {
            if targets.is_empty() {
                return Err(GatewayError::EmptyTargets);
            }
            let access_token = self.access_token().await?;
            let outcomes = futures::future::join_all(
                targets
                    .iter()
                    .map(|address| self.send_one(&access_token, message, address)),
            )
            .await;
            Ok(BatchReport::from_outcomes(outcomes))
        }
        .boxed()
    }
}

pub fn parse_private_key(pem: &str) -> Result<RS256KeyPair, GatewayError> {
    RS256KeyPair::from_pem(pem).map_err(|err| GatewayError::Credentials(err.to_string()))
}

pub(crate) fn message_body(message: &PushMessage, address: &str) -> JsonValue {
    json!({
        "message": {
            "token": address,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": {
                "priority": message.android.priority,
                "notification": {
                    "channel_id": message.android.channel_id,
                    "sound": message.android.sound,
                },
            },
            "apns": {
                "headers": { "apns-priority": message.apns.priority },
                "payload": {
                    "aps": {
                        "sound": message.apns.sound,
                        "badge": message.apns.badge,
                    },
                },
            },
        }
    })
}
