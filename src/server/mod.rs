/// HTTP API server mode
/// Exposes the inspection snapshot, each panel and every operator action as JSON

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub use routes::create_router;

#[cfg(feature = "server")]
pub async fn run(
    host: String,
    port: u16,
    enable_cors: bool,
    controller: std::sync::Arc<crate::core::Controller>,
) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::net::SocketAddr;

    let app = create_router(controller, enable_cors);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    println!("vps-panel API on http://{}/api", addr);
    println!("   No authentication: bind to a trusted interface only");
    println!();
    println!("Endpoints:");
    println!("   GET    /api/snapshot              - Full inspection pass");
    println!("   GET    /api/disk                  - Disk usage");
    println!("   GET    /api/containers            - Containers with image tags");
    println!("   GET    /api/ports                 - LISTEN sockets and exposed ports");
    println!("   GET    /api/databases             - PostgreSQL databases");
    println!("   GET    /api/images                - Images, uptime, images in use");
    println!("   GET    /api/images/dangling       - Dangling images");
    println!("   DELETE /api/images/:id            - Remove an image");
    println!("   POST   /api/containers/stop       - Stop containers");
    println!("   POST   /api/containers/remove     - Force-remove containers");
    println!("   GET    /api/apps                  - Applications");
    println!("   POST   /api/apps                  - Create an application");
    println!("   GET    /api/apps/:name/compose    - Read a descriptor");
    println!("   PUT    /api/apps/:name/compose    - Save a descriptor and recreate");
    println!("   GET    /api/readme                - Operator documentation");
    println!();

    tracing::info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
