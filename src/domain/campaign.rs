use actix_web::web;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;

use crate::domain::preferences::Audience;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sent,
}

impl CampaignStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, CampaignStatus::Sent)
    }

    pub fn parse(status: &str) -> Result<CampaignStatus, String> {
        match status {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sent" => Ok(CampaignStatus::Sent),
            _ => Err(format!("{} is not a valid campaign status", status)),
        }
    }
}

impl AsRef<str> for CampaignStatus {
    fn as_ref(&self) -> &str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sent => "sent",
        }
    }
}

impl TryFrom<String> for CampaignStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CampaignStatus::parse(&value)
    }
}

impl From<CampaignStatus> for String {
    fn from(status: CampaignStatus) -> String {
        status.as_ref().to_string()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub campaign_id: String,
    pub title: String,
    pub subject: String,
    pub content: String,
    pub author: String,
    pub status: CampaignStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub sent_date: Option<DateTime<Utc>>,
    pub target_audience: Audience,
    pub template: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewCampaign {
    pub title: String,
    pub subject: String,
    pub content: String,
    pub author: String,
    pub target_audience: Audience,
    pub template: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaignBody {
    pub title: String,
    pub subject: String,
    pub content: String,
    pub author: Option<String>,
    pub target_audience: Option<String>,
    pub template: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TryFrom<web::Json<NewCampaignBody>> for NewCampaign {
    type Error = String;

    fn try_from(body: web::Json<NewCampaignBody>) -> Result<Self, Self::Error> {
        let body = body.into_inner();

        if body.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if body.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if body.content.trim().is_empty() {
            return Err("content must not be empty".to_string());
        }

        let target_audience = match body.target_audience.as_deref() {
            Some(audience) => Audience::parse(audience)?,
            None => Audience::All,
        };

        Ok(NewCampaign {
            title: body.title,
            subject: body.subject,
            content: body.content,
            author: body.author.unwrap_or_else(|| "Admin".to_string()),
            target_audience,
            template: body.template,
            metadata: body.metadata,
        })
    }
}

/// Partial update applied to a campaign; absent fields keep their current
/// value. Status transitions are not expressible here, only through the
/// schedule and mark-as-sent operations.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub target_audience: Option<Audience>,
    pub template: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub fn generate_campaign_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = std::iter::repeat_with(|| rng.sample(rand::distributions::Alphanumeric))
        .map(char::from)
        .take(8)
        .collect();

    format!(
        "campaign-{}-{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}
