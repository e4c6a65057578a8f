use influxdb::InfluxDbProvider;
use std::env;
use std::path::PathBuf;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;

const CERT_ENV: &str = "TF_PROVIDER_INFLUXDB_CERT";
const KEY_ENV: &str = "TF_PROVIDER_INFLUXDB_KEY";

/// Explicit path from the environment, otherwise relative to the binary
fn tls_path(var: &str, exe_dir: Option<&PathBuf>, file: &str) -> PathBuf {
    env::var_os(var).map(PathBuf::from).unwrap_or_else(|| {
        exe_dir
            .map(|dir| dir.join("../../certs").join(file))
            .unwrap_or_else(|| PathBuf::from("certs").join(file))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let config = ServerConfig::new()
        .with_cert_path(tls_path(CERT_ENV, exe_dir.as_ref(), "localhost.pem"))
        .with_key_path(tls_path(KEY_ENV, exe_dir.as_ref(), "localhost-key.pem"));

    tfplug::serve(InfluxDbProvider::new(), config).await?;

    Ok(())
}
