use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::routes::subscriptions::SubscribeError;
use crate::services::LifecycleManager;

#[derive(Deserialize, Debug)]
pub struct UnsubscribeBody {
    pub email: String,
}

#[tracing::instrument(
    name = "Unsubscribe from the newsletter handler",
    skip(body, lifecycle),
    fields(
        subscriber_email = %body.email,
    )
)]
pub async fn handle_unsubscribe(
    body: web::Json<UnsubscribeBody>,
    lifecycle: web::Data<LifecycleManager>,
) -> Result<HttpResponse, SubscribeError> {
    let email =
        SubscriberEmail::parse(body.into_inner().email).map_err(SubscribeError::Validation)?;

    let outcome = lifecycle.unsubscribe(&email).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": outcome })))
}
