use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

pub async fn configure_tls(tls: &TlsConfig) -> Result<RustlsConfig, anyhow::Error> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificate/key: {e}"))
}
