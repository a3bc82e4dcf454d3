use super::{IPushNotifier, PushError};
use care_reminder_domain::Notification;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

// https://firebase.google.com/docs/cloud-messaging/migrate-v1

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const TOKEN_LIFETIME_SECS: i64 = 60 * 60;
// Refresh the access token when it has less than this left
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

#[derive(Serialize)]
struct FirebaseClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    // Access token expires in specified in seconds
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

struct AccessToken {
    token: String,
    expires_at: i64,
}

/// Push notifier backed by the Firebase Cloud Messaging HTTP v1 api.
/// Authorizes with a service account and caches the access token until
/// shortly before it expires.
pub struct FcmPushNotifier {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    access_token: Mutex<Option<AccessToken>>,
}

impl FcmPushNotifier {
    pub fn new(key: ServiceAccountKey) -> anyhow::Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            key,
            encoding_key,
            client: reqwest::Client::new(),
            access_token: Mutex::new(None),
        })
    }

    pub fn from_service_account_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let key: ServiceAccountKey = serde_json::from_str(&contents)?;
        Self::new(key)
    }

    fn send_endpoint(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.key.project_id
        )
    }

    async fn get_access_token(&self) -> Result<String, PushError> {
        let mut cached = self.access_token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if now + TOKEN_EXPIRY_MARGIN_SECS < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Refreshing FCM access token");
        let claims = FirebaseClaims {
            iss: &self.key.client_email,
            scope: FCM_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| PushError::Auth(e.to_string()))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let res = self
            .client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!("status {}: {}", status, body)));
        }
        let res = res.json::<TokenResponse>().await?;

        let token = res.access_token.clone();
        *cached = Some(AccessToken {
            token: res.access_token,
            expires_at: now + res.expires_in,
        });
        Ok(token)
    }
}

#[async_trait::async_trait]
impl IPushNotifier for FcmPushNotifier {
    async fn send(&self, device_token: &str, notification: &Notification) -> Result<String, PushError> {
        let access_token = self.get_access_token().await?;
        let body = json!({
            "message": {
                "token": device_token,
                "notification": {
                    "title": notification.title,
                    "body": notification.body,
                }
            }
        });

        let res = self
            .client
            .post(self.send_endpoint())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PushError::Rejected { status, body });
        }

        Ok(res.json::<SendResponse>().await?.name)
    }
}
