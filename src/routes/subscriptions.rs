use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::domain::new_subscriber::{NewSubscriber, NewSubscriberBody};
use crate::routes::{error_body, error_chain_fmt};
use crate::services::{LifecycleManager, Subscription, SubscriptionError};

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, request, lifecycle),
    fields(
        subscriber_email = %body.email
    )
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriberBody>,
    request: HttpRequest,
    lifecycle: web::Data<LifecycleManager>,
) -> Result<HttpResponse, SubscribeError> {
    let ip_address = request
        .connection_info()
        .realip_remote_addr()
        .map(String::from);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let new_subscriber = NewSubscriber::parse(body.into_inner(), ip_address, user_agent)
        .map_err(SubscribeError::Validation)?;

    match lifecycle.subscribe(new_subscriber).await? {
        Subscription::Created(subscriber) => Ok(HttpResponse::Created().json(subscriber)),
        Subscription::Reactivated(subscriber) => Ok(HttpResponse::Ok().json(subscriber)),
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscribeError::Subscription(SubscriptionError::AlreadySubscribed(_)) => {
                StatusCode::CONFLICT
            }
            SubscribeError::Subscription(SubscriptionError::NotFound(_)) => StatusCode::NOT_FOUND,
            SubscribeError::Subscription(SubscriptionError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!("Failed to handle a subscription: {:?}", self);
            return HttpResponse::build(status_code).json(error_body("Internal server error"));
        }

        HttpResponse::build(status_code).json(error_body(&self.to_string()))
    }
}
