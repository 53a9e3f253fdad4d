use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use matrimony_match::config::{LoggingSettings, Settings};
use matrimony_match::core::{InterestWorkflow, MatchService, Matcher};
use matrimony_match::routes::{self, AppState, JwtVerifier};
use matrimony_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, CachedProfileDirectory, InterestStore,
    MatchLedger, MemoryStore, PostgresClient, ProfileDirectory, UserDirectory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// `database.url` value that keeps matches and interests in process memory
const MEMORY_DATABASE_URL: &str = "memory://";

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    init_logging(&settings.logging);

    info!("Starting matrimony match service...");

    let appwrite = Arc::new(
        AppwriteClient::new(
            settings.appwrite.endpoint.clone(),
            settings.appwrite.api_key.clone(),
            settings.appwrite.project_id.clone(),
            settings.appwrite.database_id.clone(),
            AppwriteCollections {
                profiles: settings.collection.profiles.clone(),
                users: settings.collection.users.clone(),
            },
        )
        .map_err(|e| startup_error("Failed to create Appwrite client", e))?,
    );

    info!("Appwrite client initialized");

    // Profile cache is optional; the service runs uncached without Redis
    let directory: Arc<dyn ProfileDirectory> = appwrite.clone();
    let profiles: Arc<dyn ProfileDirectory> = match &settings.cache {
        Some(cache) => {
            let ttl = cache.ttl_secs.unwrap_or(300);
            let l1_size = cache.l1_cache_size.unwrap_or(1000);
            match CacheManager::new(&cache.redis_url, l1_size, ttl).await {
                Ok(manager) => {
                    info!("Profile cache initialized (L1: {} entries, TTL: {}s)", l1_size, ttl);
                    Arc::new(CachedProfileDirectory::new(directory, Arc::new(manager)))
                }
                Err(e) => {
                    warn!("Failed to connect to Redis ({}), running without cache", e);
                    directory
                }
            }
        }
        None => directory,
    };
    let users: Arc<dyn UserDirectory> = appwrite;

    let (ledger, store): (Arc<dyn MatchLedger>, Arc<dyn InterestStore>) =
        if settings.database.url == MEMORY_DATABASE_URL {
            warn!("Using in-memory storage; matches and interests are lost on restart");
            let memory = Arc::new(MemoryStore::new());
            (memory.clone() as Arc<dyn MatchLedger>, memory as Arc<dyn InterestStore>)
        } else {
            let postgres = Arc::new(
                PostgresClient::from_settings(
                    &settings.database.url,
                    settings.database.max_connections,
                    settings.database.min_connections,
                    settings.database.acquire_timeout_secs,
                    settings.database.idle_timeout_secs,
                )
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
            );
            info!("PostgreSQL client initialized");
            (postgres.clone() as Arc<dyn MatchLedger>, postgres as Arc<dyn InterestStore>)
        };

    let weights = settings.scoring.weights.to_weights();
    info!("Matcher initialized with weights: {:?}", weights);

    let matches = Arc::new(MatchService::new(
        Matcher::new(weights),
        profiles.clone(),
        ledger,
        settings.match_options(),
    ));
    let interests = Arc::new(InterestWorkflow::new(
        profiles,
        users,
        store,
        settings.interest_policy(),
    ));

    let purge_interval = settings.interests.purge_interval_secs;
    if purge_interval > 0 {
        let workflow = interests.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(purge_interval));
            loop {
                ticker.tick().await;
                if let Err(e) = workflow.purge_expired(chrono::Utc::now()).await {
                    error!("Expired interest purge failed: {}", e);
                }
            }
        });
        info!("Expired interest purge scheduled every {}s", purge_interval);
    }

    let app_state = AppState {
        matches,
        interests,
    };
    let verifier = web::Data::new(JwtVerifier::new(&settings.auth.jwt_secret));

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(verifier.clone())
            .configure(routes::configure_extractors)
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
