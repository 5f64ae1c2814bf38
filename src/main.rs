use std::net::SocketAddr;

use clap::Parser;
use lingonest::cli::{
    Args, build_config, handle_promote_admin, init_logging, load_jwt_secret, open_database,
    validate_public_base_url,
};
use lingonest::{create_app, init_cleanup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(local_id) = args.promote_admin.as_deref() {
        handle_promote_admin(&db, local_id).await;
    }

    let Some(public_base_url) = validate_public_base_url(&args.public_base_url) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    let config = build_config(&args, db, jwt_secret, &public_base_url);

    init_cleanup(&config.db).await;

    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    #[cfg(feature = "test-mode")]
    println!("LINGONEST_READY port={}", local_addr.port());

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
