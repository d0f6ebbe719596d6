pub mod api;
pub mod shutdown;

use crate::relay::Relay;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use log::{ info, error };

pub use self::api::router;

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

pub struct Server {
    addr: SocketAddr,
    relay: Arc<Relay>,
    tls: Option<TlsPaths>,
}

impl Server {
    pub fn new(addr: SocketAddr, relay: Arc<Relay>, tls: Option<TlsPaths>) -> Self {
        Self { addr, relay, tls }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = router(self.relay.clone());

        match &self.tls {
            Some(tls) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    tls.cert_path,
                    tls.key_path
                );
                let tls_config = axum_server::tls_rustls::RustlsConfig
                    ::from_pem_file(&tls.cert_path, &tls.key_path).await
                    .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    shutdown::shutdown_signal().await;
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });

                info!("HTTPS relay listening on: https://{}", self.addr);
                axum_server::bind_rustls(self.addr, tls_config)
                    .handle(handle)
                    .serve(app.into_make_service()).await?;
            }
            None => {
                let listener = match tokio::net::TcpListener::bind(self.addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!("Failed to bind HTTP server to {}: {}. Try a different port.", self.addr, e);
                        return Err(e.into());
                    }
                };
                info!("HTTP relay listening on: http://{}", self.addr);
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown::shutdown_signal()).await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}
