use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;
use sqlx::sqlite::SqlitePoolOptions;

use tasklink_backend::auth::AuthService;
use tasklink_backend::config::AppConfig;
use tasklink_backend::routes;
use tasklink_backend::session::SessionGate;
use tasklink_backend::todos::TodoService;
use tasklink_backend::webhook::WebhookDispatcher;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    info!("Connecting to database: {}", config.database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to create pool");

    info!("Running database migrations");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let auth_service = web::Data::new(AuthService::new(pool.clone()));
    let todo_service = web::Data::new(TodoService::new(pool.clone()));
    let dispatcher = web::Data::new(WebhookDispatcher::new(config.webhook_url.clone()));
    if !dispatcher.is_configured() {
        info!("N8N_WEBHOOK_URL not set; workflow-engine integration disabled");
    }

    info!("Starting server at http://{}", config.bind_addr);
    let bind_addr = config.bind_addr.clone();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(SessionGate)
            .app_data(auth_service.clone())
            .app_data(todo_service.clone())
            .app_data(dispatcher.clone())
            .configure(routes::config)
    })
    .bind(bind_addr)?
    .run()
    .await
}
