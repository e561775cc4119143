pub mod demo_handlers;
pub mod poll_handlers;
pub mod survey_handlers;
pub mod wallet_handlers;
pub mod wizard_handlers;

use actix_web::{
    web, Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

/// Reject POST/PUT/DELETE requests whose Content-Type is not JSON.
///
/// A cross-origin form post cannot carry `application/json`, so this doubles
/// as the CSRF guard for the cookie session. GET requests pass through.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Register every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/wallet", web::get().to(wallet_handlers::status))
            .route("/wallet/connect", web::post().to(wallet_handlers::connect))
            .route("/wallet/disconnect", web::post().to(wallet_handlers::disconnect))
            .route("/account", web::get().to(wallet_handlers::account))
            // /polls/browse and /polls/dashboard BEFORE /polls/{id}
            .route("/polls/browse", web::get().to(poll_handlers::browse))
            .route("/polls/dashboard", web::get().to(poll_handlers::dashboard))
            .route("/polls/{id}", web::get().to(poll_handlers::detail))
            .route("/polls/{id}/feedback", web::post().to(poll_handlers::submit_feedback))
            .route("/polls/{id}/survey", web::get().to(survey_handlers::current))
            .route("/polls/{id}/survey/answer", web::post().to(survey_handlers::answer))
            .route("/polls/{id}/survey/next", web::post().to(survey_handlers::next))
            .route("/polls/{id}/survey/back", web::post().to(survey_handlers::back))
            .route("/polls/{id}/survey/submit", web::post().to(survey_handlers::submit))
            .route("/wizard/poll", web::get().to(wizard_handlers::poll_state))
            .route("/wizard/poll", web::put().to(wizard_handlers::poll_update))
            .route("/wizard/poll/next", web::post().to(wizard_handlers::poll_next))
            .route("/wizard/poll/questions", web::post().to(wizard_handlers::poll_add_question))
            .route(
                "/wizard/poll/questions/{index}",
                web::delete().to(wizard_handlers::poll_remove_question),
            )
            .route("/wizard/poll/back", web::post().to(wizard_handlers::poll_back))
            .route("/wizard/poll/draft", web::post().to(wizard_handlers::poll_draft))
            .route("/wizard/poll/submit", web::post().to(wizard_handlers::poll_submit))
            .route("/wizard/profile", web::get().to(wizard_handlers::profile_state))
            .route("/wizard/profile", web::put().to(wizard_handlers::profile_update))
            .route(
                "/wizard/profile/industries",
                web::post().to(wizard_handlers::profile_toggle_industry),
            )
            .route("/wizard/profile/next", web::post().to(wizard_handlers::profile_next))
            .route("/wizard/profile/back", web::post().to(wizard_handlers::profile_back))
            .route("/wizard/profile/submit", web::post().to(wizard_handlers::profile_submit))
            .route("/demo/seed", web::post().to(demo_handlers::seed))
            .route("/demo/reset", web::post().to(demo_handlers::reset)),
    );
}
