use actix_web::http::header::CONTENT_TYPE;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::storage::FileStore;

const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

#[derive(Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

/// Accepts a raw file body and stores it under a collision-free key. Used by
/// the admin dashboard for images and documents referenced from site content.
#[tracing::instrument(
    name = "Uploading a file handler",
    skip(params, body, request, file_store),
    fields(filename = %params.filename, size = body.len())
)]
pub async fn handle_upload(
    params: web::Query<UploadParams>,
    body: web::Bytes,
    request: HttpRequest,
    file_store: web::Data<FileStore>,
) -> impl Responder {
    let content_type = match request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        Some(content_type) if ALLOWED_CONTENT_TYPES.contains(&content_type) => {
            content_type.to_string()
        }
        Some(content_type) => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": format!("{} is not a supported file type", content_type) }))
        }
        None => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Content-Type header is required" }))
        }
    };

    if body.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "File body is empty" }));
    }

    let key = format!(
        "uploads/{}/{}-{}",
        chrono::Utc::now().year(),
        Uuid::new_v4(),
        sanitize_filename(&params.filename)
    );

    match file_store.put(&key, body.to_vec(), &content_type).await {
        Ok(url) => HttpResponse::Created().json(json!({ "key": key, "url": url })),
        Err(err) => {
            tracing::error!("Failed to store uploaded file: {:?}", err);
            HttpResponse::InternalServerError().json(json!({ "error": "Storage error" }))
        }
    }
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|char| {
            if char.is_ascii_alphanumeric() || matches!(char, '.' | '-' | '_') {
                char
            } else {
                '-'
            }
        })
        .collect()
}
