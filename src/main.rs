use std::{process, sync::Arc};

use lectern::{
    application::{
        comments::CommentIngestService,
        content::ContentStore,
        error::AppError,
        export::StaticExporter,
        form::{CommentForm, CommentFormInput, SubmitOutcome},
        generator::StaticPageGenerator,
    },
    cache::PageCache,
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        sanity::SanityClient,
        telemetry,
        transport::HttpCommentTransport,
    },
    presentation::{article::ArticleRenderer, assets::AssetResolver},
};
use tokio::sync::Notify;
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
        config::Command::Build(_) => run_build(settings).await,
        config::Command::Comment(args) => run_comment(args).await,
    }
}

struct ContentContext {
    store: Arc<dyn ContentStore>,
    generator: StaticPageGenerator,
}

fn build_content_context(settings: &config::Settings) -> Result<ContentContext, AppError> {
    let content = settings.content.as_ref().ok_or_else(|| {
        InfraError::configuration(
            "content.project_id is required (set LECTERN__CONTENT__PROJECT_ID or --content-project-id)",
        )
    })?;

    let store: Arc<dyn ContentStore> = Arc::new(SanityClient::new(content)?);
    let renderer = ArticleRenderer::with_default_serializers(
        AssetResolver::new(content.project_id.clone(), content.dataset.clone()),
        settings.site.timezone,
        settings.site.title.clone(),
    );
    let generator = StaticPageGenerator::new(
        Arc::clone(&store),
        Arc::new(renderer),
        settings.site.revalidate,
    );

    Ok(ContentContext { store, generator })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let ContentContext { store, generator } = build_content_context(&settings)?;
    let pages = PageCache::new(generator);

    if settings.site.prerender {
        if let Err(err) = pages.prerender().await {
            warn!(error = %err, "prerender skipped; pages will build on first request");
        }
    }

    let comments = CommentIngestService::new(store);
    let router = http::build_router(RouterState {
        http: HttpState {
            pages,
            comments: comments.clone(),
        },
        api: ApiState { comments },
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let draining = Arc::new(Notify::new());
    let signal = {
        let draining = Arc::clone(&draining);
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    };
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(signal);
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "graceful shutdown timed out");
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn run_build(settings: config::Settings) -> Result<(), AppError> {
    let ContentContext { generator, .. } = build_content_context(&settings)?;
    let exporter = StaticExporter::new(generator, settings.build.output_dir.clone());
    let report = exporter.export().await?;

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "{} page(s) failed to build: {}",
            report.failed.len(),
            report.failed.join(", ")
        )))
    }
}

async fn run_comment(args: config::CommentArgs) -> Result<(), AppError> {
    let transport = HttpCommentTransport::for_site(&args.site)?;
    let mut form = CommentForm::new(args.article_id).with_input(CommentFormInput {
        name: args.name,
        email: args.email,
        comment: args.comment,
    });

    match form.submit(&transport).await {
        SubmitOutcome::Sent | SubmitOutcome::Ignored => {
            println!("Thank you for submitting");
            println!("Once it's been approved it will appear below");
            Ok(())
        }
        SubmitOutcome::Invalid => {
            for message in form.messages() {
                eprintln!("{message}");
            }
            Err(AppError::unexpected("comment form is incomplete"))
        }
        SubmitOutcome::Failed => Err(AppError::unexpected(
            form.submit_error()
                .unwrap_or("comment submission failed")
                .to_string(),
        )),
    }
}
