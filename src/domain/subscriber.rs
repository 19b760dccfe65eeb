use actix_web::web;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::preferences::SubscriberPreferences;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: SubscriberEmail,
    pub first_name: SubscriberName,
    pub last_name: SubscriberName,
    pub is_active: bool,
    pub subscription_date: DateTime<Utc>,
    pub preferences: SubscriberPreferences,
    pub updated_at: DateTime<Utc>,
}

pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub first_name: SubscriberName,
    pub last_name: SubscriberName,
    pub preferences: SubscriberPreferences,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscriberBody {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferences: Option<SubscriberPreferences>,
}

impl TryFrom<web::Json<NewSubscriberBody>> for NewSubscriber {
    type Error = String;

    fn try_from(body: web::Json<NewSubscriberBody>) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email.clone())?;
        let first_name = match &body.first_name {
            Some(name) => SubscriberName::parse(name.clone())?,
            None => SubscriberName::empty(),
        };
        let last_name = match &body.last_name {
            Some(name) => SubscriberName::parse(name.clone())?,
            None => SubscriberName::empty(),
        };

        Ok(NewSubscriber {
            email,
            first_name,
            last_name,
            preferences: body.preferences.unwrap_or_default(),
        })
    }
}
