//! TLS context construction from configured key and trust stores.
//!
//! # Responsibilities
//! - Validate store references (type, location, passphrase)
//! - Load the server certificate chain and private key from the key store
//! - Load client trust roots from the trust store, enabling client
//!   certificate verification when one is configured
//! - Select protocol versions per configuration
//!
//! # Design Decisions
//! - Only the "pem" store type is supported; anything else is fatal at
//!   startup, never downgraded to plaintext
//! - The key store is one PEM file carrying the certificate chain and the
//!   private key; the trust store is a PEM CA bundle

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

use crate::config::schema::{SecureTransportSettings, StoreSettings};
use crate::secret::{use_secret, Secret};

/// The one store container format this gateway reads.
pub const STORE_TYPE_PEM: &str = "pem";

/// Error raised while building the TLS context. Always fatal at startup.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("store type '{store_type}' is not supported (store at '{location}')")]
    UnsupportedStoreType { store_type: String, location: String },

    #[error("store type 'pem' does not take a passphrase (store at '{0}')")]
    UnexpectedPassphrase(String),

    #[error("failed to read store '{location}': {source}")]
    StoreRead {
        location: String,
        source: std::io::Error,
    },

    #[error("store '{location}' contains no usable {expected}")]
    EmptyStore {
        location: String,
        expected: &'static str,
    },

    #[error("failed to parse PEM material in '{location}': {message}")]
    BadStore { location: String, message: String },

    #[error("unknown TLS protocol '{0}', expected \"tls1.2\" or \"tls1.3\"")]
    UnknownProtocol(String),

    #[error("failed to build TLS context: {0}")]
    Context(String),
}

/// Builds the rustls server configuration for the encrypted listener.
pub struct SecureTransport {
    settings: SecureTransportSettings,
}

impl SecureTransport {
    pub fn new(settings: SecureTransportSettings) -> Self {
        Self { settings }
    }

    /// Load both stores and assemble the TLS context.
    pub fn build_server_config(&self) -> Result<ServerConfig, TransportError> {
        validate_store(&self.settings.key_store)?;
        if let Some(trust_store) = &self.settings.trust_store {
            validate_store(trust_store)?;
        }

        let versions: &[&rustls::SupportedProtocolVersion] = match self.settings.protocol.as_deref()
        {
            None => rustls::DEFAULT_VERSIONS,
            Some("tls1.2") => &[&rustls::version::TLS12],
            Some("tls1.3") => &[&rustls::version::TLS13],
            Some(other) => return Err(TransportError::UnknownProtocol(other.to_string())),
        };

        let (chain, key) = load_key_store(&self.settings.key_store)?;
        let trust_roots = match &self.settings.trust_store {
            Some(trust_store) => Some((trust_store, load_trust_store(trust_store)?)),
            None => None,
        };

        // pin the crypto provider; repeat installs are fine
        let _ = rustls::crypto::ring::default_provider().install_default();
        let builder = ServerConfig::builder_with_protocol_versions(versions);

        let builder = match trust_roots {
            Some((trust_store, roots)) => {
                tracing::info!(
                    location = %trust_store.location.display(),
                    roots = roots.len(),
                    "client certificate verification enabled"
                );
                let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                    .build()
                    .map_err(|err| TransportError::Context(err.to_string()))?;
                builder.with_client_cert_verifier(verifier)
            }
            None => builder.with_no_client_auth(),
        };

        builder
            .with_single_cert(chain, key)
            .map_err(|err| TransportError::Context(err.to_string()))
    }
}

fn validate_store(store: &StoreSettings) -> Result<(), TransportError> {
    let location = store.location.display().to_string();
    if store.store_type != STORE_TYPE_PEM {
        return Err(TransportError::UnsupportedStoreType {
            store_type: store.store_type.clone(),
            location,
        });
    }
    if store.passphrase_file.is_some() {
        return Err(TransportError::UnexpectedPassphrase(location));
    }
    Ok(())
}

/// Read the key store: certificate chain plus exactly one private key.
///
/// The raw PEM buffer is treated as secret material and erased once the
/// parsed DER copies exist.
fn load_key_store(
    store: &StoreSettings,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TransportError> {
    let location = store.location.display().to_string();
    let pem = Secret::from_file(&store.location).map_err(|source| TransportError::StoreRead {
        location: location.clone(),
        source,
    })?;

    let (chain, key) = use_secret(pem, |bytes| {
        let mut reader: &[u8] = bytes;
        let mut chain = Vec::new();
        let mut key = None;
        for item in rustls_pemfile::read_all(&mut reader) {
            match item.map_err(|err| TransportError::BadStore {
                location: location.clone(),
                message: err.to_string(),
            })? {
                rustls_pemfile::Item::X509Certificate(cert) => chain.push(cert),
                rustls_pemfile::Item::Pkcs8Key(der) => key = Some(PrivateKeyDer::Pkcs8(der)),
                rustls_pemfile::Item::Pkcs1Key(der) => key = Some(PrivateKeyDer::Pkcs1(der)),
                rustls_pemfile::Item::Sec1Key(der) => key = Some(PrivateKeyDer::Sec1(der)),
                _ => {}
            }
        }
        Ok((chain, key))
    })?;

    if chain.is_empty() {
        return Err(TransportError::EmptyStore {
            location,
            expected: "certificate chain",
        });
    }
    let key = key.ok_or(TransportError::EmptyStore {
        location,
        expected: "private key",
    })?;
    Ok((chain, key))
}

/// Read the trust store: a PEM bundle of client CA certificates.
fn load_trust_store(store: &StoreSettings) -> Result<RootCertStore, TransportError> {
    let location = store.location.display().to_string();
    let bytes = std::fs::read(&store.location).map_err(|source| TransportError::StoreRead {
        location: location.clone(),
        source,
    })?;

    let mut reader: &[u8] = &bytes;
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|err| TransportError::BadStore {
            location: location.clone(),
            message: err.to_string(),
        })?;
        roots.add(cert).map_err(|err| TransportError::BadStore {
            location: location.clone(),
            message: err.to_string(),
        })?;
    }

    if roots.is_empty() {
        return Err(TransportError::EmptyStore {
            location,
            expected: "trust roots",
        });
    }
    Ok(roots)
}
