//! Server module for running Terraform providers
//!
//! Starts the gRPC service over TLS on an ephemeral localhost port and
//! prints the go-plugin handshake line Terraform waits for on stdout.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::proto::tfplugin6::provider_server::ProviderServer;
use crate::provider::ProviderV2;
use std::path::PathBuf;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};

/// Handshake prefix: core protocol version 1, plugin protocol version 6
const HANDSHAKE_PREFIX: &str = "1|6|tcp";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

pub(crate) fn handshake_line(port: u16) -> String {
    format!("{}|127.0.0.1:{}|grpc", HANDSHAKE_PREFIX, port)
}

/// Main entry point for running a provider
pub async fn serve<P: ProviderV2 + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    // An already installed process-wide provider is kept
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(&config.cert_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read certificate {}: {}",
            config.cert_path.display(),
            e
        ))
    })?;
    let key = tokio::fs::read(&config.key_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read key {}: {}",
            config.key_path.display(),
            e
        ))
    })?;
    let tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

    let service = ProviderServer::new(ProviderService::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    println!("{}", handshake_line(port));
    tracing::info!(port, "provider server listening");

    Server::builder()
        .tls_config(tls_config)?
        .add_service(service)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
