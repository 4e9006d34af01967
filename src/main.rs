use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use rfq_match::config::Settings;
use rfq_match::routes::{self, MAX_BODY_BYTES};
use rfq_match::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting RFQ match service...");

    // Load the model and build shared state; nothing is served without a model
    let app_state = match AppState::from_settings(&settings) {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Matcher ready: model {} ({} features, baseline {:.4})",
        app_state.matcher.scorer().model_identifier(),
        app_state.matcher.scorer().schema().len(),
        app_state.matcher.scorer().baseline()
    );
    info!(
        "Rate limit: {} requests per {:?} per client",
        app_state.limiter.config().capacity,
        app_state.limiter.config().window
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let state = web::Data::new(app_state);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await?;

    info!("RFQ match service stopped");
    Ok(())
}
