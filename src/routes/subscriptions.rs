use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::domain::preferences::Preference;
use crate::domain::subscriber::{NewSubscriber, NewSubscriberBody};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::store::{SubscriberStore, SubscriberStoreError};

#[derive(Deserialize)]
pub struct EmailBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ListSubscribersParams {
    pub preference: Option<String>,
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, store),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_subscribe(
    body: web::Json<NewSubscriberBody>,
    store: web::Data<SubscriberStore>,
) -> impl Responder {
    let new_subscriber: NewSubscriber = match body.try_into() {
        Ok(subscriber) => subscriber,
        Err(err) => {
            tracing::error!("Validation error: {:?}", err);
            return HttpResponse::BadRequest().json(json!({ "error": err }));
        }
    };

    match store.create(&new_subscriber).await {
        Ok(subscriber) => HttpResponse::Created().json(subscriber),
        Err(SubscriberStoreError::AlreadySubscribed(email)) => HttpResponse::BadRequest().json(
            json!({ "error": format!("{} is already subscribed. Use resubscribe to reactivate it.", email) }),
        ),
        Err(err) => {
            tracing::error!("Failed to insert new subscriber: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(
    name = "Unsubscribing a subscriber handler",
    skip(body, store),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_unsubscribe(
    body: web::Json<EmailBody>,
    store: web::Data<SubscriberStore>,
) -> impl Responder {
    let email = match SubscriberEmail::parse(body.email.clone()) {
        Ok(email) => email,
        Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
    };

    let subscriber = match store.find_by_email(&email).await {
        Ok(Some(subscriber)) => subscriber,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(json!({ "error": format!("{} is not subscribed", email) }))
        }
        Err(err) => {
            tracing::error!("Failed to fetch subscriber: {:?}", err);
            return HttpResponse::InternalServerError().finish();
        }
    };

    if !subscriber.is_active {
        return HttpResponse::BadRequest()
            .json(json!({ "error": format!("{} is already unsubscribed", email) }));
    }

    match store.unsubscribe(&email).await {
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Successfully unsubscribed" })),
        Err(err) => {
            tracing::error!("Failed to unsubscribe: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Reactivates a soft-deleted subscription. Calling it on an already-active
/// subscriber succeeds without changes, since this is the documented recovery
/// path after a duplicate subscribe attempt.
#[tracing::instrument(
    name = "Resubscribing a subscriber handler",
    skip(body, store),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_resubscribe(
    body: web::Json<EmailBody>,
    store: web::Data<SubscriberStore>,
) -> impl Responder {
    let email = match SubscriberEmail::parse(body.email.clone()) {
        Ok(email) => email,
        Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
    };

    match store.resubscribe(&email).await {
        Ok(0) => HttpResponse::NotFound()
            .json(json!({ "error": format!("{} is not subscribed", email) })),
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Successfully resubscribed" })),
        Err(err) => {
            tracing::error!("Failed to resubscribe: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(name = "Listing subscribers handler", skip(params, store))]
pub async fn handle_list_subscribers(
    params: web::Query<ListSubscribersParams>,
    store: web::Data<SubscriberStore>,
) -> impl Responder {
    let subscribers = match params.preference.as_deref() {
        None => store.get_active_subscribers().await,
        Some(name) => match Preference::parse(name) {
            Ok(preference) => store.get_subscribers_by_preference(preference).await,
            Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
        },
    };

    match subscribers {
        Ok(subscribers) => HttpResponse::Ok().json(subscribers),
        Err(err) => {
            tracing::error!("Failed to list subscribers: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[tracing::instrument(name = "Deleting a subscriber handler", skip(store))]
pub async fn handle_delete_subscriber(
    path: web::Path<String>,
    store: web::Data<SubscriberStore>,
) -> impl Responder {
    let email = match SubscriberEmail::parse(path.into_inner()) {
        Ok(email) => email,
        Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
    };

    match store.delete(&email).await {
        Ok(0) => HttpResponse::NotFound()
            .json(json!({ "error": format!("{} is not subscribed", email) })),
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(err) => {
            tracing::error!("Failed to delete subscriber: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}
