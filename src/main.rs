use std::{io::Read, path::Path, process, sync::Arc};

use scrivano::{
    application::{
        archive::ArchiveScheduler,
        error::AppError,
        generate::DocumentService,
    },
    config,
    infra::{
        error::InfraError,
        lifecycle::LifecycleStore,
        store::{ArtifactStore, FsArtifactStore},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Generate(args) => run_generate(settings, args).await,
        config::Command::Stats(args) => run_stats(settings, args).await,
        config::Command::Reconcile(_) => run_reconcile(settings).await,
    }
}

struct ApplicationContext {
    service: DocumentService,
    scheduler: Arc<ArchiveScheduler>,
}

fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let storage: Arc<dyn ArtifactStore> = Arc::new(
        FsArtifactStore::new(
            settings.storage.active_dir.clone(),
            settings.storage.archive_dir.clone(),
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let lifecycle = Arc::new(LifecycleStore::new());
    let scheduler = Arc::new(ArchiveScheduler::new(
        lifecycle.clone(),
        storage.clone(),
        settings.archival.delay,
    ));
    let service = DocumentService::new(
        storage,
        lifecycle,
        scheduler.clone(),
        settings.storage.template_dir.clone(),
    );

    Ok(ApplicationContext { service, scheduler })
}

async fn run_generate(
    settings: config::Settings,
    args: config::GenerateArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    let text = read_source(&args.file)?;
    let style_set = args
        .style_set
        .as_deref()
        .unwrap_or(settings.conversion.style_set.as_str());

    let paths = app
        .service
        .generate(&text, args.name.as_deref(), style_set)
        .await?;

    info!(
        target = "scrivano::generate",
        id = paths.id,
        "generation completed"
    );
    println!("{}", paths.document.display());
    println!("{}", paths.source_text.display());

    // The archival job fires long after this process exits; the reconcile
    // command picks it up.
    app.scheduler.shutdown();
    Ok(())
}

async fn run_stats(settings: config::Settings, args: config::StatsArgs) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    app.scheduler
        .restore()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to index stores: {err}")))?;

    let stats = app.service.stats();
    if args.json {
        let body = serde_json::to_string_pretty(&stats)
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        println!("{body}");
    } else {
        println!("active:   {}", stats.active_count);
        println!("archived: {}", stats.archived_count);
        for (date, ids) in app.service.list_archive_by_date() {
            println!("{date}: {}", ids.join(", "));
        }
    }

    app.scheduler.shutdown();
    Ok(())
}

async fn run_reconcile(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    let restored = app
        .scheduler
        .restore()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to index stores: {err}")))?;
    let report = app.scheduler.reconcile().await;

    info!(
        target = "scrivano::reconcile",
        restored,
        archived = report.archived,
        failed = report.failed,
        "reconciliation completed"
    );
    if report.failed > 0 {
        return Err(AppError::unexpected(format!(
            "{} artifact(s) could not be archived",
            report.failed
        )));
    }

    app.scheduler.shutdown();
    Ok(())
}

fn read_source(path: &Path) -> Result<String, AppError> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| AppError::from(InfraError::Io(err)))?;
        return Ok(text);
    }

    std::fs::read_to_string(path).map_err(|err| AppError::from(InfraError::Io(err)))
}
