use std::sync::Arc;

use actix_web::{App, HttpServer};
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookservice_catalog::api::ResourceUrls;
use bookservice_catalog::app_config::{config_app, cors, form_config};
use bookservice_catalog::books_repository::{
    BookRepository, InMemoryBookRepository, PostgresBooksRepository,
    PostgresBooksRepositoryConfig,
};
use bookservice_catalog::settings::Settings;

const APP_NAME: &str = "bookservice_catalog";

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() {
    // Spans are exported in batch to the Jaeger agent
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(APP_NAME)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let formatting_layer = BunyanFormattingLayer::new(APP_NAME.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let settings = Settings::load()?;

    let books_repository: Arc<dyn BookRepository> = if settings.database.in_memory {
        tracing::info!("Using in memory books repository");
        Arc::new(InMemoryBookRepository::default())
    } else {
        Arc::new(
            PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
                hostname: settings.database.hostname.clone(),
                username: settings.database.username.clone(),
                password: settings.database.password.clone(),
            })
            .await?,
        )
    };
    let urls = ResourceUrls::new(&settings.server.public_url);

    tracing::info!(
        "Starting HTTP server at {}:{}, public url {}",
        settings.server.host,
        settings.server.port,
        settings.server.public_url
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(books_repository.clone()))
            .app_data(web::Data::new(urls.clone()))
            .app_data(form_config())
            .wrap(cors())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    Ok(())
}
