use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionUser;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Thin REST client. Failed calls are reported once and never retried.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config.base_url.clone()))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let payload = resp.json::<ErrorPayload>().await.ok();
        let code = payload
            .as_ref()
            .and_then(|p| p.code.clone())
            .unwrap_or_else(|| status.as_str().to_string());
        let message = payload
            .and_then(|p| p.message)
            .unwrap_or_else(|| code.clone());
        debug!(%status, %code, "api call failed");
        Err(ClientError::Api {
            status,
            code,
            message,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let resp = self
            .request(Method::POST, "/api/auth/login", None)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn logout(&self, token: &str) -> ClientResult<()> {
        let resp = self
            .request(Method::POST, "/api/auth/logout", Some(token))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> ClientResult<T> {
        let resp = self.request(Method::GET, path, Some(token)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, token: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::POST, path, Some(token))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, token: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::PUT, path, Some(token))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete(&self, path: &str, token: &str) -> ClientResult<StatusCode> {
        let resp = self.request(Method::DELETE, path, Some(token)).send().await?;
        Ok(Self::check(resp).await?.status())
    }
}
