use std::{process, sync::Arc};

use fastly_cms::{
    application::{error::AppError, publish::PublishService},
    config,
    fastly::{
        CachePolicyWriter, FastlyHooks, FileSettings, PublishCollector, PurgeClient,
        PurgeClientOptions, Purger, SettingsAccessor, install_defaults, uninstall,
    },
    infra::{
        content::InMemoryContentStore,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Install(_) => run_install(&settings),
        config::Command::Uninstall(_) => run_uninstall(&settings),
        config::Command::Purge(args) => run_purge(&settings, args).await,
    }
}

fn fastly_settings(settings: &config::Settings) -> SettingsAccessor {
    SettingsAccessor::new(Arc::new(FileSettings::new(
        settings.fastly.settings_file.clone(),
    )))
}

fn purge_client(
    settings: &config::Settings,
    accessor: SettingsAccessor,
) -> Result<PurgeClient, AppError> {
    PurgeClient::new(
        accessor,
        PurgeClientOptions {
            api_base: settings.fastly.api_base.clone(),
            request_timeout: settings.fastly.request_timeout,
        },
    )
    .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = match settings.content.seed_file.as_ref() {
        Some(path) => InMemoryContentStore::from_seed_file(path).await?,
        None => {
            warn!(
                target = "fastly_cms::serve",
                "no content seed configured; serving an empty store"
            );
            InMemoryContentStore::new()
        }
    };
    let store = Arc::new(store);

    let accessor = fastly_settings(&settings);
    let purger: Arc<dyn Purger> = Arc::new(purge_client(&settings, accessor.clone())?);
    let collector = PublishCollector::new(accessor.clone(), store.clone(), purger.clone());
    let policy = CachePolicyWriter::new(accessor.clone());
    let hooks = Arc::new(FastlyHooks::new(accessor.clone(), collector, policy));

    if settings.admin.token.is_none() {
        warn!(
            target = "fastly_cms::serve",
            "admin token is not configured; admin endpoints and previews will reject every request"
        );
    }

    let http_state = HttpState {
        content: store.clone(),
        hooks: hooks.clone(),
        admin: settings.admin.clone(),
    };
    let admin_state = AdminState {
        content: store.clone(),
        resolver: store.clone(),
        publish: PublishService::new(store.clone(), hooks),
        purger,
        settings: accessor,
        admin: settings.admin.clone(),
    };

    serve_http(&settings, http_state, admin_state).await
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "fastly_cms::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(
                target = "fastly_cms::serve",
                error = %err,
                "failed to listen for shutdown signal"
            );
            return;
        }
        info!(target = "fastly_cms::serve", "shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        wait_for_shutdown(shutdown_rx).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = deadline => {
            warn!(
                target = "fastly_cms::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn run_install(settings: &config::Settings) -> Result<(), AppError> {
    let report = install_defaults(&settings.fastly.settings_file)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    if report.changed() {
        for key in &report.added {
            info!(target = "fastly_cms::install", key, "setting added");
        }
    } else {
        info!(
            target = "fastly_cms::install",
            path = %report.path.display(),
            "all settings already present"
        );
    }
    Ok(())
}

fn run_uninstall(settings: &config::Settings) -> Result<(), AppError> {
    let report = uninstall(&settings.fastly.settings_file)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    for key in &report.removed {
        info!(target = "fastly_cms::install", key, "setting removed");
    }
    Ok(())
}

async fn run_purge(settings: &config::Settings, args: config::PurgeArgs) -> Result<(), AppError> {
    let client = purge_client(settings, fastly_settings(settings))?;
    let response = client
        .purge(&args.url)
        .await
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    println!("{} {}", response.status.as_u16(), response.url);
    if !response.status.is_success() {
        return Err(AppError::unexpected(format!(
            "purge rejected with status {}",
            response.status
        )));
    }
    Ok(())
}
