use std::sync::Arc;

use credit_intake::admin;
use credit_intake::api::PortalClient;
use credit_intake::channels::{Channel, CliChannel, WsChannel};
use credit_intake::config::PortalConfig;
use credit_intake::flow::IntakeFlow;
use credit_intake::notifications;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PortalConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export PORTAL_EMAIL=you@example.com");
        eprintln!("  export PORTAL_PASSWORD=...");
        std::process::exit(1);
    });

    eprintln!("💳 Credit Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Portal: {}", config.api_url);

    let client = Arc::new(PortalClient::new(&config.api_url));

    // First run against a fresh portal account: PORTAL_REGISTER=1 creates it.
    if std::env::var("PORTAL_REGISTER").is_ok() {
        match client.register(&config.email, &config.password).await {
            Ok(()) => eprintln!("   Registered: {}", config.email),
            Err(e) => eprintln!("   Registration skipped: {e}"),
        }
    }

    let user = client.login(&config.email, &config.password).await?;
    eprintln!("   Account: {}", user.email);

    if user.is_admin {
        // Admins get the review console instead of the intake chat.
        let feed_channel: Arc<dyn Channel> = Arc::new(CliChannel::new());
        tokio::spawn(notifications::listen(
            config.notifications_url.clone(),
            user.id,
            feed_channel,
        ));
        admin::run(client).await?;
        return Ok(());
    }

    // Existing applications, the way the portal's dashboard lists them.
    match client.my_applications().await {
        Ok(apps) if !apps.is_empty() => {
            eprintln!("   Your applications:");
            for app in &apps {
                let decision = app.final_decision.as_deref().unwrap_or("Pending Review");
                if app.is_decided() {
                    eprintln!(
                        "     #{} {} — {} ({})",
                        app.id,
                        app.status,
                        decision,
                        client.report_url(app.id)
                    );
                } else {
                    eprintln!("     #{} {} — {}", app.id, app.status, decision);
                }
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not load existing applications"),
    }

    let channel: Arc<dyn Channel> = match config.ws_port {
        Some(port) => {
            let ws = WsChannel::new();
            let app = ws.router();
            tokio::spawn(async move {
                let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
                    .await
                    .expect("Failed to bind chat server port");
                tracing::info!(port, "Chat WebSocket server started");
                axum::serve(listener, app).await.ok();
            });
            eprintln!("   Chat WS: ws://0.0.0.0:{port}/ws/chat\n");
            Arc::new(ws)
        }
        None => {
            eprintln!("   Channel: cli — type your answers and press Enter.\n");
            Arc::new(CliChannel::new())
        }
    };

    // Notification feed runs for the lifetime of the process.
    let feed_channel = Arc::clone(&channel);
    tokio::spawn(notifications::listen(
        config.notifications_url.clone(),
        user.id,
        feed_channel,
    ));

    IntakeFlow::new().run(channel, client).await?;

    Ok(())
}
