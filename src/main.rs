mod api;
mod capability;
mod db;
mod domain;
mod migrations;
mod nice_display;
mod object_storage;
mod open_ai;
mod open_ai_key;
mod store;
mod story_generator;
mod worker;

use crate::nice_display::NiceDisplay;
use crate::worker::Worker;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Parser, Clone)]
#[clap(version = "0.1", about = "Commands for YouSpace")]
enum Cmd {
    Run,
    NewMigration { migration_name: String },
    RunMigrations,
}

enum Error {
    ActixWeb(WebServerError),
    NewMigration(migrations::Error),
    RunMigrations(migrations::Error),
    EnvVars(dotenv::Error),
}

impl NiceDisplay for Error {
    fn message(&self) -> String {
        match self {
            Error::ActixWeb(err) => err.message(),
            Error::NewMigration(err) => err.message(),
            Error::RunMigrations(err) => err.message(),
            Error::EnvVars(err) => err.message(),
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), String> {
    nice_main()
        .await
        .map_err(|err| err.to_nice_error().to_string())
}

async fn nice_main() -> Result<(), Error> {
    dotenv::dotenv().map_err(Error::EnvVars)?;

    let cmd = Cmd::parse();

    match cmd {
        Cmd::Run => run_server().await.map_err(Error::ActixWeb),
        Cmd::NewMigration { migration_name } => migrations::new(migration_name)
            .await
            .map_err(Error::NewMigration),
        Cmd::RunMigrations => migrations::run().await.map_err(Error::RunMigrations),
    }
}

enum WebServerError {
    WorkerInit(worker::InitError),
    Bind(std::io::Error),
    Run(std::io::Error),
}

impl NiceDisplay for WebServerError {
    fn message(&self) -> String {
        match self {
            WebServerError::WorkerInit(err) => {
                format!("Worker initialization error\n{}", err.message())
            }
            WebServerError::Run(err) => format!("Error running server: {}", err),
            WebServerError::Bind(err) => {
                format!("Error binding server: {}", err)
            }
        }
    }
}

// Keep the guard alive for the lifetime of the server so buffered file logs
// are flushed on shutdown.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match dotenv::var("LOG_DIR") {
        Ok(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "youspace.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();

            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

async fn run_server() -> Result<(), WebServerError> {
    let _guard = init_tracing();

    let worker = Worker::new().await.map_err(WebServerError::WorkerInit)?;
    let data = web::Data::new(worker);

    let port = dotenv::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    tracing::info!(port, "running server");

    HttpServer::new(move || App::new().app_data(data.clone()).configure(api::configure))
        .bind(("127.0.0.1", port))
        .map_err(WebServerError::Bind)?
        .run()
        .await
        .map_err(WebServerError::Run)
}
