//! Vendor school API client
//!
//! Every request waits on a shared token bucket (one request per 250 ms)
//! before it is sent. A 401 triggers one token refresh, after which the
//! refreshed tokens are written back to the auth file and the request is
//! retried once.

use crate::config::AuthConfig;
use crate::error::FetchError;
use crate::services::list_fetcher::{ListPageSource, ListRow};
use async_trait::async_trait;
use bbx_common::AcademicYear;
use chrono::{DateTime, Datelike, NaiveDate};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const API_BASE_URL: &str = "https://api.sky.blackbaud.com/school/v1";
pub const TOKEN_URL: &str = "https://oauth2.sky.blackbaud.com/token";

const SUBSCRIPTION_HEADER: &str = "Bb-Api-Subscription-Key";
const USER_AGENT: &str = concat!("bbextract/", env!("CARGO_PKG_VERSION"));
const REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct AdvancedList {
    #[serde(default)]
    results: AdvancedListResults,
}

#[derive(Debug, Default, Deserialize)]
struct AdvancedListResults {
    #[serde(default)]
    rows: Vec<ListRow>,
}

#[derive(Debug, Deserialize)]
struct YearsResponse {
    #[serde(default)]
    value: Vec<YearEntry>,
}

#[derive(Debug, Deserialize)]
struct YearEntry {
    #[serde(default)]
    current_year: bool,
    #[serde(default)]
    school_year_label: Option<String>,
    begin_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct AttendanceResponse {
    #[serde(default)]
    value: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Rate-limited, token-refreshing API client
pub struct SkyClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    auth: RwLock<AuthConfig>,
    auth_path: Option<PathBuf>,
    base_url: String,
    token_url: String,
}

impl SkyClient {
    /// Build a client; `auth_path` receives refreshed tokens when set
    pub fn new(auth: AuthConfig, auth_path: Option<PathBuf>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let quota = Quota::with_period(REQUEST_INTERVAL)
            .ok_or_else(|| FetchError::Task("request interval must be non-zero".to_string()))?;

        Ok(Self {
            http,
            limiter: RateLimiter::direct(quota),
            auth: RwLock::new(auth),
            auth_path,
            base_url: API_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        })
    }

    /// Point the client at another API host
    pub fn with_endpoints(mut self, base_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Load the auth file, probe the test endpoint and refresh if needed
    pub async fn connect(auth_path: PathBuf) -> Result<Self, FetchError> {
        let auth = AuthConfig::load(&auth_path).map_err(|e| FetchError::Auth(e.to_string()))?;
        let client = Self::new(auth, Some(auth_path))?;
        client.probe().await?;
        Ok(client)
    }

    /// GET the auth file's test endpoint
    pub async fn probe(&self) -> Result<(), FetchError> {
        let endpoint = self.auth.read().await.other.test_api_endpoint.clone();
        if endpoint.trim().is_empty() {
            debug!("No test endpoint configured; skipping probe");
            return Ok(());
        }
        self.get(&endpoint, &[]).await?;
        info!("Vendor API reachable");
        Ok(())
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, FetchError> {
        let mut refreshed = false;
        loop {
            self.limiter.until_ready().await;

            let (key, token) = {
                let auth = self.auth.read().await;
                (
                    auth.other.api_subscription_key.clone(),
                    auth.tokens.access_token.clone(),
                )
            };

            debug!(url, "GET");
            let response = self
                .http
                .get(url)
                .query(query)
                .header(SUBSCRIPTION_HEADER, key)
                .bearer_auth(&token)
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                if refreshed {
                    return Err(FetchError::Auth(
                        "access token rejected after refresh".to_string(),
                    ));
                }
                warn!(url, "Access token rejected; refreshing");
                self.refresh_token(&token).await?;
                refreshed = true;
                continue;
            }

            return check_status(response).await;
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Skipped when another task already replaced `stale_token`.
    pub async fn refresh_token(&self, stale_token: &str) -> Result<(), FetchError> {
        let mut auth = self.auth.write().await;
        if auth.tokens.access_token != stale_token {
            debug!("Token already refreshed by another request");
            return Ok(());
        }

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", auth.tokens.refresh_token.as_str()),
            ("preserve_refresh_token", "true"),
            ("client_id", auth.sky_app_information.app_id.as_str()),
            ("client_secret", auth.sky_app_information.app_secret.as_str()),
        ];

        self.limiter.until_ready().await;
        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Auth(format!(
                "could not refresh token: HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let tokens: TokenResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        auth.tokens.access_token = tokens.access_token;
        auth.tokens.refresh_token = tokens.refresh_token;

        if let Some(path) = &self.auth_path {
            auth.save(path)
                .map_err(|e| FetchError::Auth(format!("could not save refreshed tokens: {}", e)))?;
        }
        info!("Access token refreshed");
        Ok(())
    }

    /// One page of an advanced list (pages start at 1)
    pub async fn advanced_list_page(
        &self,
        list_id: &str,
        page: u32,
    ) -> Result<Vec<ListRow>, FetchError> {
        let url = advanced_list_url(&self.base_url, list_id);
        let body = self.get(&url, &[("page", page.to_string())]).await?.text().await?;
        parse_advanced_list(&body)
    }

    /// Current academic year as reported by the vendor
    pub async fn academic_year(&self) -> Result<AcademicYear, FetchError> {
        let url = format!("{}/years", self.base_url);
        let body = self.get(&url, &[]).await?.text().await?;
        current_academic_year(&body)
    }

    /// Attendance records for one level on one day
    pub async fn attendance(
        &self,
        level_id: &str,
        day: NaiveDate,
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, FetchError> {
        let url = format!("{}/attendance", self.base_url);
        let body = self
            .get(&url, &attendance_query(level_id, day))
            .await?
            .text()
            .await?;
        let parsed: AttendanceResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(parsed.value)
    }
}

#[async_trait]
impl ListPageSource for SkyClient {
    async fn list_page(&self, list_id: &str, page: u32) -> Result<Vec<ListRow>, FetchError> {
        self.advanced_list_page(list_id, page).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status(status.as_u16(), body))
}

fn advanced_list_url(base_url: &str, list_id: &str) -> String {
    format!("{}/lists/advanced/{}", base_url.trim_end_matches('/'), list_id)
}

fn attendance_query(level_id: &str, day: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("level_id", level_id.to_string()),
        ("day", day.format("%m/%d/%Y").to_string()),
        ("offering_type", "1".to_string()),
    ]
}

fn parse_advanced_list(body: &str) -> Result<Vec<ListRow>, FetchError> {
    let parsed: AdvancedList =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(parsed.results.rows)
}

/// Pick the entry flagged `current_year` and take the calendar years of its
/// begin and end dates
fn current_academic_year(body: &str) -> Result<AcademicYear, FetchError> {
    let parsed: YearsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let current = parsed
        .value
        .iter()
        .find(|y| y.current_year)
        .ok_or_else(|| FetchError::Decode("no current academic year in response".to_string()))?;

    let begin = DateTime::parse_from_rfc3339(&current.begin_date)
        .map_err(|e| FetchError::Decode(format!("begin_date {}: {}", current.begin_date, e)))?;
    let end = DateTime::parse_from_rfc3339(&current.end_date)
        .map_err(|e| FetchError::Decode(format!("end_date {}: {}", current.end_date, e)))?;

    let year = AcademicYear::new(begin.year(), end.year());
    debug!(
        label = current.school_year_label.as_deref().unwrap_or(""),
        school_year = %year,
        "Resolved current academic year"
    );
    Ok(year)
}
