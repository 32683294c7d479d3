mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod state;

use crate::app::App;
use crate::cli::{StorageBackendArg, CLI};
use crate::state::AppState;
use anyhow::{anyhow, Context};
use clap::Parser;
use fluster_shortener::{
    HttpRedirectResolver, SafeBrowsingChecker, Shortener, ShortenerService,
};
use fluster_storage::{InMemoryRepository, PostgresRepository, Repository};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local runs keep credentials in .env; deployed runs get a real environment.
    let dotenv = dotenvy::dotenv();

    let config = CLI::try_parse()?;
    init_tracing(config.lambda);

    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        lambda = config.lambda,
        max_redirects = config.max_redirects,
        "starting fluster gateway"
    );

    let resolver = HttpRedirectResolver::new(&config.resolver_settings())
        .context("failed to build redirect resolver")?;
    let checker = SafeBrowsingChecker::new(config.safe_browsing_settings())
        .context("failed to build threat checker")?;

    match config.storage {
        StorageBackendArg::InMemory => {
            run(config, InMemoryRepository::new(), resolver, checker).await
        }
        StorageBackendArg::Postgres => {
            let settings = config
                .postgres_settings()
                .context("postgres connection settings are incomplete")?;
            let repository = PostgresRepository::connect(&settings).await?;
            repository.migrate().await?;
            run(config, repository, resolver, checker).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    // CloudWatch stamps every line itself
    if json {
        subscriber.json().without_time().init();
    } else {
        subscriber.init();
    }
}

async fn run<R: Repository>(
    config: CLI,
    repository: R,
    resolver: HttpRedirectResolver,
    checker: SafeBrowsingChecker,
) -> anyhow::Result<()> {
    let shortener = Arc::new(ShortenerService::new(repository, resolver, checker));

    if let Some(url) = config.shorten {
        let code = shortener.shorten(&url).await?;
        println!("{code}");
        return Ok(());
    }

    let router = App::router(AppState::new(shortener));

    if config.lambda {
        info!("serving through the lambda runtime");
        lambda_http::run(router).await.map_err(|e| anyhow!(e))
    } else {
        let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
        info!(listen_addr = %listener.local_addr()?, "starting gateway server");
        axum::serve(listener, router).await?;
        Ok(())
    }
}
