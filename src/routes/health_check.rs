use actix_web::{HttpRequest, HttpResponse, Responder};

/// Liveness probe: 200 with an empty body while the server accepts requests
#[tracing::instrument(name = "Health Check handler", skip(_request))]
pub async fn health_check(_request: HttpRequest) -> impl Responder {
    HttpResponse::Ok().finish()
}
