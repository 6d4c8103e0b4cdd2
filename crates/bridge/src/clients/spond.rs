//! Spond API client.
//!
//! Spond has no official public API; this talks to the same endpoints the
//! Spond apps use. Login is a single email/password exchange for a bearer
//! token, cached for the lifetime of the client and refreshed once when the
//! API answers 401.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{Availability, Event, Person, PersonId};
use std::time::Duration;
use tokio::sync::Mutex;

use super::EventsPlatform;
use crate::config::SpondConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_EVENTS: &str = "100";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    login_token: String,
}

#[derive(Debug, Deserialize)]
struct Group {
    #[serde(default)]
    members: Vec<GroupMember>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProfileRef {
    id: String,
}

/// A member entry inside a group; guardians share the same shape.
#[derive(Debug, Clone, Deserialize)]
struct GroupMember {
    #[serde(flatten)]
    person: Person,
    #[serde(default)]
    profile: Option<ProfileRef>,
    #[serde(default)]
    guardians: Vec<GroupMember>,
}

impl GroupMember {
    fn matches(&self, person_id: &str) -> bool {
        self.person.id == person_id
            || self
                .profile
                .as_ref()
                .map(|p| p.id == person_id)
                .unwrap_or(false)
    }
}

/// Search members, then their guardians, of every group.
fn find_member(groups: &[Group], person_id: &str) -> Option<Person> {
    groups
        .iter()
        .flat_map(|g| g.members.iter())
        .find_map(|member| {
            if member.matches(person_id) {
                return Some(member.person.clone());
            }
            member
                .guardians
                .iter()
                .find(|guardian| guardian.matches(person_id))
                .map(|guardian| guardian.person.clone())
        })
}

/// Body of a response update.
///
/// Spond only models accepted/declined; "maybe" is sent as an unconfirmed
/// decline so the member stays in the pending buckets of the event.
fn response_payload(choice: Availability) -> serde_json::Value {
    match choice {
        Availability::Yes => json!({ "accepted": "true" }),
        Availability::No => json!({ "accepted": "false" }),
        Availability::Maybe => json!({ "accepted": "false", "unconfirmed": "true" }),
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct SpondClient {
    http: reqwest::Client,
    config: SpondConfig,
    token: Mutex<Option<String>>,
}

impl SpondClient {
    pub fn new(config: SpondConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn login(&self) -> Result<String> {
        let response = self
            .http
            .post(self.url("login"))
            .json(&LoginRequest {
                email: &self.config.username,
                password: &self.config.password,
            })
            .send()
            .await
            .context("Failed to reach Spond login")?
            .error_for_status()
            .context("Spond login rejected")?;

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse Spond login response")?;

        tracing::info!("Logged in to Spond as {}", self.config.username);
        Ok(login.login_token)
    }

    async fn token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Send an authenticated request, logging in again once on 401.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let token = self.token().await?;
        let response = build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to reach Spond API")?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Spond token rejected, logging in again");
            *self.token.lock().await = None;
            let token = self.token().await?;
            build(&self.http)
                .bearer_auth(&token)
                .send()
                .await
                .context("Failed to reach Spond API")?
        } else {
            response
        };

        response
            .error_for_status()
            .context("Spond API returned an error")
    }

    async fn get_events(
        &self,
        min_start: DateTime<Utc>,
        max_start: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let url = self.url("sponds/");
        let min_start = format_timestamp(min_start);
        let max_start = format_timestamp(max_start);

        let response = self
            .execute(|http| {
                http.get(&url).query(&[
                    ("minStartTimestamp", min_start.as_str()),
                    ("maxStartTimestamp", max_start.as_str()),
                    ("max", MAX_EVENTS),
                    ("scheduled", "true"),
                    ("order", "asc"),
                    ("includeHidden", "false"),
                    ("addProfileInfo", "true"),
                ])
            })
            .await?;

        response
            .json::<Vec<Event>>()
            .await
            .context("Failed to parse Spond events")
    }

    async fn get_groups(&self) -> Result<Vec<Group>> {
        let url = self.url("groups/");
        let response = self.execute(|http| http.get(&url)).await?;

        response
            .json::<Vec<Group>>()
            .await
            .context("Failed to parse Spond groups")
    }
}

#[async_trait]
impl EventsPlatform for SpondClient {
    async fn upcoming_events(&self, days_ahead: u32) -> Result<Vec<Event>> {
        let now = Utc::now();
        let events = self
            .get_events(now, now + ChronoDuration::days(i64::from(days_ahead)))
            .await?;

        tracing::info!(
            "Fetched {} Spond events in the next {} days",
            events.len(),
            days_ahead
        );
        Ok(events)
    }

    async fn get_person(&self, person_id: &PersonId) -> Result<Person> {
        let groups = self.get_groups().await?;
        find_member(&groups, person_id.as_str())
            .with_context(|| format!("Person {} not found in any Spond group", person_id))
    }

    async fn set_response(
        &self,
        event_id: &str,
        person_id: &PersonId,
        choice: Availability,
    ) -> Result<()> {
        let url = self.url(&format!("sponds/{}/responses/{}", event_id, person_id));
        let payload = response_payload(choice);

        self.execute(|http| http.put(&url).json(&payload)).await?;

        tracing::info!(
            "Set Spond response for {} on event {} to {}",
            person_id,
            event_id,
            choice
        );
        Ok(())
    }
}
