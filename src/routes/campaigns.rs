use actix_web::{web, HttpResponse, Responder, ResponseError};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::domain::campaign::{Campaign, CampaignStatus, CampaignUpdate, NewCampaign, NewCampaignBody};
use crate::domain::preferences::Audience;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::newsletter::dispatch::{NewsletterDispatcher, SendSummary};
use crate::newsletter::template::{render, RecipientFields};
use crate::store::{CampaignStore, SubscriberStore};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCampaignBody {
    pub scheduled_date: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSendBody {
    pub test_email: Option<String>,
}

#[derive(Deserialize)]
pub struct ListCampaignsParams {
    pub status: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCampaignResponse {
    pub message: String,
    pub campaign: Campaign,
    pub email_results: EmailResults,
}

#[derive(serde::Serialize)]
pub struct EmailResults {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl From<&SendSummary> for EmailResults {
    fn from(summary: &SendSummary) -> Self {
        EmailResults {
            total: summary.total,
            successful: summary.successful,
            failed: summary.failed,
        }
    }
}

#[tracing::instrument(
    name = "Creating a new campaign handler",
    skip(body, store),
    fields(campaign_title = %body.title)
)]
pub async fn handle_create_campaign(
    body: web::Json<NewCampaignBody>,
    store: web::Data<CampaignStore>,
) -> impl Responder {
    let new_campaign: NewCampaign = match body.try_into() {
        Ok(campaign) => campaign,
        Err(err) => {
            tracing::error!("Validation error: {:?}", err);
            return HttpResponse::BadRequest().json(json!({ "error": err }));
        }
    };

    match store.create(new_campaign).await {
        Ok(campaign) => HttpResponse::Created().json(campaign),
        Err(err) => {
            tracing::error!("Failed to insert new campaign: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(name = "Listing campaigns handler", skip(params, store))]
pub async fn handle_list_campaigns(
    params: web::Query<ListCampaignsParams>,
    store: web::Data<CampaignStore>,
) -> impl Responder {
    let status = match params.status.as_deref() {
        None => None,
        Some(status) => match CampaignStatus::parse(status) {
            Ok(status) => Some(status),
            Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
        },
    };

    match store.get_by_status(status).await {
        Ok(campaigns) => HttpResponse::Ok().json(campaigns),
        Err(err) => {
            tracing::error!("Failed to list campaigns: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(name = "Fetching a campaign handler", skip(store))]
pub async fn handle_get_campaign(
    path: web::Path<String>,
    store: web::Data<CampaignStore>,
) -> impl Responder {
    let campaign_id = path.into_inner();

    match store.find_by_id(&campaign_id).await {
        Ok(Some(campaign)) => HttpResponse::Ok().json(campaign),
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "error": format!("Campaign {} was not found", campaign_id) })),
        Err(err) => {
            tracing::error!("Failed to fetch campaign: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(name = "Updating a campaign handler", skip(body, store))]
pub async fn handle_update_campaign(
    path: web::Path<String>,
    body: web::Json<CampaignUpdate>,
    store: web::Data<CampaignStore>,
) -> impl Responder {
    let campaign_id = path.into_inner();

    match store.update(&campaign_id, &body).await {
        Ok(Some(campaign)) => HttpResponse::Ok().json(campaign),
        Ok(None) => HttpResponse::NotFound()
            .json(json!({ "error": format!("Campaign {} was not found", campaign_id) })),
        Err(err) => {
            tracing::error!("Failed to update campaign: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(
    name = "Scheduling a campaign handler",
    skip(body, store),
    fields(scheduled_date = %body.scheduled_date)
)]
pub async fn handle_schedule_campaign(
    path: web::Path<String>,
    body: web::Json<ScheduleCampaignBody>,
    store: web::Data<CampaignStore>,
) -> impl Responder {
    let campaign_id = path.into_inner();

    let campaign = match store.find_by_id(&campaign_id).await {
        Ok(Some(campaign)) => campaign,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "error": format!("Campaign {} was not found", campaign_id) }))
        }
        Err(err) => {
            tracing::error!("Failed to fetch campaign: {:?}", err);
            return HttpResponse::InternalServerError().finish();
        }
    };

    if campaign.status.is_sent() {
        return HttpResponse::BadRequest().json(
            json!({ "error": format!("Campaign {} has already been sent", campaign_id) }),
        );
    }

    match store.schedule(&campaign_id, body.scheduled_date).await {
        Ok(Some(campaign)) => HttpResponse::Ok().json(campaign),
        // The guard in the store lost a race against a concurrent send
        Ok(None) => HttpResponse::BadRequest().json(
            json!({ "error": format!("Campaign {} has already been sent", campaign_id) }),
        ),
        Err(err) => {
            tracing::error!("Failed to schedule campaign: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(thiserror::Error)]
pub enum SendCampaignError {
    #[error("Campaign {0} was not found")]
    CampaignNotFound(String),
    #[error("Campaign {0} has already been sent")]
    AlreadySent(String),
    #[error("Campaign {0} has no matching subscribers")]
    NoSubscribers(String),
    #[error("Failed to fetch the campaign from the database.")]
    GetCampaignError(#[source] sqlx::Error),
    #[error("Failed to fetch subscribers from the database.")]
    GetSubscribersError(#[source] sqlx::Error),
    #[error("Failed to record the campaign as sent.")]
    MarkSentError(#[source] sqlx::Error),
}

impl std::fmt::Debug for SendCampaignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for SendCampaignError {
    fn status_code(&self) -> StatusCode {
        match self {
            SendCampaignError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
            SendCampaignError::AlreadySent(_) => StatusCode::BAD_REQUEST,
            SendCampaignError::NoSubscribers(_) => StatusCode::BAD_REQUEST,
            SendCampaignError::GetCampaignError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SendCampaignError::GetSubscribersError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SendCampaignError::MarkSentError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Delivers a campaign to its target audience. The campaign is marked sent
/// only after the pipeline has settled every recipient, so a crash mid-run
/// leaves it in a re-sendable state rather than silently half-delivered.
#[tracing::instrument(
    name = "Sending a campaign to its audience",
    skip(campaign_store, subscriber_store, dispatcher)
)]
pub async fn handle_send_campaign(
    path: web::Path<String>,
    campaign_store: web::Data<CampaignStore>,
    subscriber_store: web::Data<SubscriberStore>,
    dispatcher: web::Data<NewsletterDispatcher>,
) -> Result<HttpResponse, SendCampaignError> {
    let campaign_id = path.into_inner();

    let campaign = campaign_store
        .find_by_id(&campaign_id)
        .await
        .map_err(SendCampaignError::GetCampaignError)?
        .ok_or_else(|| SendCampaignError::CampaignNotFound(campaign_id.clone()))?;

    if campaign.status.is_sent() {
        return Err(SendCampaignError::AlreadySent(campaign_id));
    }

    let subscribers = resolve_audience(&subscriber_store, campaign.target_audience)
        .await
        .map_err(SendCampaignError::GetSubscribersError)?;

    if subscribers.is_empty() {
        return Err(SendCampaignError::NoSubscribers(campaign_id));
    }

    let summary = dispatcher
        .send_newsletter(&subscribers, &campaign.subject, &campaign.content, None)
        .await;

    tracing::info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "Campaign dispatch settled"
    );

    let campaign = campaign_store
        .mark_as_sent(&campaign_id)
        .await
        .map_err(SendCampaignError::MarkSentError)?
        .unwrap_or(campaign);

    Ok(HttpResponse::Ok().json(SendCampaignResponse {
        message: format!("Campaign sent to {} subscribers", summary.total),
        email_results: EmailResults::from(&summary),
        campaign,
    }))
}

async fn resolve_audience(
    store: &web::Data<SubscriberStore>,
    audience: Audience,
) -> Result<Vec<Subscriber>, sqlx::Error> {
    match audience {
        Audience::All => store.get_active_subscribers().await,
        Audience::Preference(preference) => store.get_subscribers_by_preference(preference).await,
    }
}

/// Sends a single copy of the campaign to one address for review. Campaign
/// status is left untouched.
#[tracing::instrument(name = "Sending a campaign test copy", skip(body, store, dispatcher))]
pub async fn handle_test_campaign(
    path: web::Path<String>,
    body: web::Json<TestSendBody>,
    store: web::Data<CampaignStore>,
    dispatcher: web::Data<NewsletterDispatcher>,
) -> impl Responder {
    let campaign_id = path.into_inner();

    let test_email = match &body.test_email {
        Some(email) => match SubscriberEmail::parse(email.clone()) {
            Ok(email) => email,
            Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
        },
        None => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "testEmail is required" }))
        }
    };

    let campaign = match store.find_by_id(&campaign_id).await {
        Ok(Some(campaign)) => campaign,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "error": format!("Campaign {} was not found", campaign_id) }))
        }
        Err(err) => {
            tracing::error!("Failed to fetch campaign: {:?}", err);
            return HttpResponse::InternalServerError().finish();
        }
    };

    let recipient = RecipientFields {
        first_name: "",
        last_name: "",
        email: test_email.as_ref(),
    };
    let html = render(&campaign.content, recipient);
    let subject = format!("[TEST] {}", campaign.subject);

    match dispatcher
        .email_client()
        .send_email(&test_email, &subject, &html, None)
        .await
    {
        Ok(_) => HttpResponse::Ok()
            .json(json!({ "message": format!("Test email sent to {}", test_email) })),
        Err(err) => {
            tracing::error!("Failed to send test email: {:?}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to send test email" }))
        }
    }
}
