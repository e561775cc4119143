use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, middleware, web};

use validify::config::AppConfig;
use validify::handlers;
use validify::state::{AppState, spawn_autosave};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();

    let (state, report) = AppState::open(&config).map_err(|e| {
        log::error!("Failed to open local poll cache in {}: {e}", config.data_dir.display());
        std::io::Error::other(e.to_string())
    })?;
    if let Some(version) = report.migrated_from {
        log::info!("Migrated local poll cache from layout version {version}");
    }
    for rejected in &report.rejected {
        log::warn!(
            "Dropped cached {} #{} on load: {}",
            rejected.kind, rejected.index, rejected.reason
        );
    }
    if report.migrated_from.is_some() || !report.rejected.is_empty() {
        state.persist();
    }

    if config.seed_demo {
        let added = state.mutate_store(|s| s.initialize_mock_polls());
        if added > 0 {
            log::info!("Seeded {added} demonstration poll(s)");
        }
    }

    let state = web::Data::new(state);
    spawn_autosave(state.clone(), config.draft_autosave);

    let secret_key = config.cookie_key();

    log::info!("Starting server at http://{}", config.bind);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound()
                    .json(serde_json::json!({ "error": "Not Found" }))
            }))
    })
    .bind(&config.bind)?
    .run()
    .await
}
