use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::campaign::{
    generate_campaign_id, Campaign, CampaignStatus, CampaignUpdate, NewCampaign,
};
use crate::domain::preferences::Audience;

#[derive(Clone)]
pub struct CampaignStore {
    pool: PgPool,
}

impl CampaignStore {
    pub fn new(pool: PgPool) -> CampaignStore {
        CampaignStore { pool }
    }

    /// New campaigns always start in draft.
    #[tracing::instrument(name = "Insert a new campaign", skip(self, new_campaign), fields(title = %new_campaign.title))]
    pub async fn create(&self, new_campaign: NewCampaign) -> Result<Campaign, sqlx::Error> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO campaigns
                (campaign_id, title, subject, content, author, status, target_audience,
                 template, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7, $8, $9, $9)
            RETURNING campaign_id, title, subject, content, author, status, scheduled_date,
                      sent_date, target_audience, template, metadata, created_at, updated_at
            "#,
        )
        .bind(generate_campaign_id())
        .bind(&new_campaign.title)
        .bind(&new_campaign.subject)
        .bind(&new_campaign.content)
        .bind(&new_campaign.author)
        .bind(new_campaign.target_audience.as_ref())
        .bind(&new_campaign.template)
        .bind(&new_campaign.metadata)
        .bind(now)
        .map(campaign_from_row)
        .fetch_one(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Fetch a campaign by id", skip(self))]
    pub async fn find_by_id(&self, campaign_id: &str) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query(
            r#"
            SELECT campaign_id, title, subject, content, author, status, scheduled_date,
                   sent_date, target_audience, template, metadata, created_at, updated_at
            FROM campaigns
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .map(campaign_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Fetch campaigns by status", skip(self))]
    pub async fn get_by_status(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query(
            r#"
            SELECT campaign_id, title, subject, content, author, status, scheduled_date,
                   sent_date, target_audience, template, metadata, created_at, updated_at
            FROM campaigns
            WHERE $1::text IS NULL OR status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.map(|status| status.as_ref().to_string()))
        .map(campaign_from_row)
        .fetch_all(&self.pool)
        .await
    }

    /// Field-merge update: absent fields keep their stored value. Status and
    /// the date columns are deliberately untouchable here; the state machine
    /// only moves through `schedule` and `mark_as_sent`.
    #[tracing::instrument(name = "Update a campaign", skip(self, changes))]
    pub async fn update(
        &self,
        campaign_id: &str,
        changes: &CampaignUpdate,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaigns
            SET title = COALESCE($2, title),
                subject = COALESCE($3, subject),
                content = COALESCE($4, content),
                author = COALESCE($5, author),
                target_audience = COALESCE($6, target_audience),
                template = COALESCE($7, template),
                metadata = COALESCE($8, metadata),
                updated_at = $9
            WHERE campaign_id = $1
            RETURNING campaign_id, title, subject, content, author, status, scheduled_date,
                      sent_date, target_audience, template, metadata, created_at, updated_at
            "#,
        )
        .bind(campaign_id)
        .bind(&changes.title)
        .bind(&changes.subject)
        .bind(&changes.content)
        .bind(&changes.author)
        .bind(changes.target_audience.map(|audience| audience.as_ref().to_string()))
        .bind(&changes.template)
        .bind(&changes.metadata)
        .bind(Utc::now())
        .map(campaign_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    /// Moves a campaign to `scheduled`. The guard keeps sent campaigns
    /// immutable, so `sent_date` stays consistent with `status`.
    #[tracing::instrument(name = "Schedule a campaign", skip(self))]
    pub async fn schedule(
        &self,
        campaign_id: &str,
        scheduled_date: DateTime<Utc>,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = 'scheduled', scheduled_date = $2, updated_at = $3
            WHERE campaign_id = $1 AND status <> 'sent'
            RETURNING campaign_id, title, subject, content, author, status, scheduled_date,
                      sent_date, target_audience, template, metadata, created_at, updated_at
            "#,
        )
        .bind(campaign_id)
        .bind(scheduled_date)
        .bind(Utc::now())
        .map(campaign_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    /// Final transition: records the send time and closes the state machine.
    #[tracing::instrument(name = "Mark a campaign as sent", skip(self))]
    pub async fn mark_as_sent(&self, campaign_id: &str) -> Result<Option<Campaign>, sqlx::Error> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = 'sent', sent_date = $2, updated_at = $2
            WHERE campaign_id = $1 AND status <> 'sent'
            RETURNING campaign_id, title, subject, content, author, status, scheduled_date,
                      sent_date, target_audience, template, metadata, created_at, updated_at
            "#,
        )
        .bind(campaign_id)
        .bind(now)
        .map(campaign_from_row)
        .fetch_optional(&self.pool)
        .await
    }
}

fn campaign_from_row(row: PgRow) -> Campaign {
    let status: String = row.get("status");
    let target_audience: String = row.get("target_audience");

    Campaign {
        campaign_id: row.get("campaign_id"),
        title: row.get("title"),
        subject: row.get("subject"),
        content: row.get("content"),
        author: row.get("author"),
        status: CampaignStatus::parse(&status).unwrap(),
        scheduled_date: row.get("scheduled_date"),
        sent_date: row.get("sent_date"),
        target_audience: Audience::parse(&target_audience).unwrap(),
        template: row.get("template"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
