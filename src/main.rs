// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use relational_login::{
    api::router,
    auth::{Event, LoginConfigBuilder, MemorySessionStore, RequestContext, Sessions},
    config::Settings,
    reaper::SessionReaper,
    state::AppState,
    store::UserDirectory,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_tracing(settings.log_format);

    // Log every lifecycle event
    let mut builder = LoginConfigBuilder::from_settings(&settings);
    for event in Event::ALL {
        builder = builder.on(event, move |ctx: RequestContext| async move {
            let user = ctx.current_user().map(|user| user.to_attributes());
            info!(%event, request_id = ?ctx.request_id(), ?user, "login event");
            Ok(())
        });
    }

    let store = MemorySessionStore::new();
    let sessions = Sessions::new(store.clone(), settings.session.clone());
    let state = AppState::new(builder, UserDirectory::demo(), sessions);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let reaper = SessionReaper::new(store).with_interval(settings.purge_interval);
    let reaper_task = tokio::spawn(reaper.run(shutdown.clone()));

    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    if settings.disabled {
        warn!("Login is disabled, secured routes are public");
    }
    info!("Relational Login server listening on http://{addr} (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
            info!("Gracefully shutdown");
        })
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    reaper_task.await.context("Session reaper panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
