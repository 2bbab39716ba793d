use actix_web::dev::Payload;
use actix_web::http::{header, StatusCode};
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures::future::{ready, Ready};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::domain::audience::TargetKind;
use crate::domain::newsletter::{NewsletterBody, NewsletterSubject};
use crate::routes::{error_body, error_chain_fmt};
use crate::services::{AudienceError, BroadcastError, BroadcastService};
use crate::startup::AdminToken;

#[derive(Deserialize, Debug)]
pub struct NewNewsletter {
    pub target: TargetKind,
    pub interest: Option<String>,
    pub subject: String,
    pub content: NewsletterContent,
}

#[derive(Deserialize, Debug)]
pub struct NewsletterContent {
    pub html: String,
}

#[derive(Deserialize, Debug)]
pub struct AudienceParameters {
    pub target: TargetKind,
    pub interest: Option<String>,
}

#[tracing::instrument(
    name = "Publishing a newsletter to the selected audience",
    skip(_admin, body, broadcast),
    fields(
        subject = %body.subject,
        target = ?body.target,
        interest = ?body.interest
    )
)]
pub async fn publish_newsletter(
    _admin: AdminAccess,
    body: web::Json<NewNewsletter>,
    broadcast: web::Data<BroadcastService>,
) -> Result<HttpResponse, NewsletterError> {
    let NewNewsletter {
        target,
        interest,
        subject,
        content,
    } = body.into_inner();
    let subject = NewsletterSubject::parse(subject).map_err(NewsletterError::Validation)?;
    let html = NewsletterBody::parse(content.html).map_err(NewsletterError::Validation)?;

    let report = broadcast
        .publish(target, interest.as_deref(), &subject, &html)
        .await?;

    Ok(HttpResponse::Ok().json(report))
}

#[tracing::instrument(
    name = "Previewing a newsletter audience",
    skip(_admin, broadcast)
)]
pub async fn get_audience(
    _admin: AdminAccess,
    parameters: web::Query<AudienceParameters>,
    broadcast: web::Data<BroadcastService>,
) -> Result<HttpResponse, NewsletterError> {
    let audience = broadcast
        .selector()
        .resolve(parameters.target, parameters.interest.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": audience.len(),
        "subscribers": audience,
    })))
}

/// Proof that the request carried the admin bearer token.
///
/// Declared as the first handler argument so it is checked before the body
/// or query string is parsed.
pub struct AdminAccess;

impl FromRequest for AdminAccess {
    type Error = NewsletterError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(request))
    }
}

fn authorize(request: &HttpRequest) -> Result<AdminAccess, NewsletterError> {
    let admin_token = request.app_data::<web::Data<AdminToken>>().ok_or_else(|| {
        tracing::error!("Admin token is not registered in the application data");
        NewsletterError::Unauthorized
    })?;
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if tokens_match(token, admin_token.0.expose_secret()) => Ok(AdminAccess),
        _ => Err(NewsletterError::Unauthorized),
    }
}

// Compares every byte so the response time does not leak the matching prefix.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());

    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[derive(thiserror::Error)]
pub enum NewsletterError {
    #[error("A valid admin token is required.")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Audience(#[from] AudienceError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

impl std::fmt::Debug for NewsletterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for NewsletterError {
    fn status_code(&self) -> StatusCode {
        match self {
            NewsletterError::Unauthorized => StatusCode::UNAUTHORIZED,
            NewsletterError::Validation(_) => StatusCode::BAD_REQUEST,
            NewsletterError::Audience(AudienceError::InvalidTarget(_))
            | NewsletterError::Broadcast(BroadcastError::Audience(AudienceError::InvalidTarget(_)))
            | NewsletterError::Broadcast(BroadcastError::NoRecipients) => StatusCode::BAD_REQUEST,
            NewsletterError::Audience(AudienceError::Store(_))
            | NewsletterError::Broadcast(BroadcastError::Audience(AudienceError::Store(_)))
            | NewsletterError::Broadcast(BroadcastError::Store { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        match status_code {
            StatusCode::UNAUTHORIZED => HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, r#"Bearer realm="newsletters""#))
                .json(error_body(&self.to_string())),
            status_code if status_code.is_server_error() => {
                tracing::error!("Failed to handle a newsletter request: {:?}", self);
                if let NewsletterError::Broadcast(BroadcastError::Store { sent, failed, .. }) = self {
                    return HttpResponse::build(status_code).json(serde_json::json!({
                        "error": "Newsletter went out but delivery outcomes were not recorded",
                        "sent": sent,
                        "failed": failed,
                    }));
                }
                HttpResponse::build(status_code).json(error_body("Internal server error"))
            }
            status_code => HttpResponse::build(status_code).json(error_body(&self.to_string())),
        }
    }
}
