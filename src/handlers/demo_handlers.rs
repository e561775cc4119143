use actix_web::{web, HttpResponse};

use crate::state::AppState;

/// POST /api/demo/seed - add the demonstration polls that are not cached yet
pub async fn seed(state: web::Data<AppState>) -> HttpResponse {
    let added = state.mutate_store(|s| s.initialize_mock_polls());
    log::info!("Seeded {added} demonstration poll(s)");
    HttpResponse::Ok().json(serde_json::json!({ "added": added }))
}

/// POST /api/demo/reset - drop every cached poll and feedback
pub async fn reset(state: web::Data<AppState>) -> HttpResponse {
    let (polls, feedbacks) = state.mutate_store(|s| {
        let counts = (s.poll_count(), s.feedback_count());
        s.clear_all_data();
        counts
    });
    log::info!("Cleared {polls} cached poll(s) and {feedbacks} feedback record(s)");
    HttpResponse::Ok().json(serde_json::json!({
        "clearedPolls": polls,
        "clearedFeedbacks": feedbacks,
    }))
}
