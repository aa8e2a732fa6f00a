use std::sync::Arc;
use tracing::info;
use waypost::config::Config;
use waypost::server::{shutdown_signal, Server};
use waypost::{logger, Router};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker thread count comes from configuration, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;

    let router = Router::with_static_options(cfg.static_files.to_options());
    for mount in &cfg.mounts {
        router.serve_files(&mount.root, &mount.url_prefix).await?;
    }

    let server = Arc::new(Server::new(router, &cfg));
    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.listen_and_serve(addr).await })
    };
    logger::log_server_start(&addr, &cfg);

    tokio::select! {
        signal = shutdown_signal() => signal?,
        // Bind or accept loop failure ends the process right away
        result = serving => return Ok(result??),
    }

    server.stop();
    info!(
        active = server.active_connections(),
        "Shutdown complete, in-flight connections finish in the background"
    );
    Ok(())
}
