//! Client certificate bundles for certificate logins.
//!
//! Responsibilities:
//! - Read PKCS#12 (`.pfx`/`.p12`) and PEM bundles.
//! - Extract exactly one private key and the certificate chain.
//! - Produce a `reqwest::Identity` for the TLS client-certificate set.
//!
//! Invariants:
//! - A bundle with no private key, or with more than one, is rejected.
//! - PEM keys are decoded as PKCS#1, then PKCS#8 (plain or encrypted), then
//!   EC; the first decoder that accepts the block wins.
//! - The identity is always re-encoded as PKCS#8 plus certificates.

use openssl::ec::EcKey;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::X509;
use pem::Pem;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ClientError, Result};

/// A decoded bundle.
pub struct CertificateBundle {
    key: PKey<Private>,
    chain: Vec<X509>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("certificates", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl CertificateBundle {
    /// Decode bundle bytes. Input holding PEM armor is read as PEM,
    /// anything else as PKCS#12 DER.
    pub fn from_bytes(data: &[u8], password: Option<&SecretString>) -> Result<Self> {
        let passphrase = password.map(|p| p.expose_secret()).unwrap_or("");
        match pem::parse_many(data) {
            Ok(blocks) if !blocks.is_empty() => Self::from_pem(&blocks, passphrase),
            _ => Self::from_pkcs12(data, passphrase),
        }
    }

    fn from_pkcs12(data: &[u8], passphrase: &str) -> Result<Self> {
        let parsed = Pkcs12::from_der(data)?.parse2(passphrase)?;
        let key = parsed
            .pkey
            .ok_or_else(|| bundle_error("bundle contains no private key"))?;
        let leaf = parsed
            .cert
            .ok_or_else(|| bundle_error("bundle contains no certificate"))?;

        let mut chain = vec![leaf];
        if let Some(ca) = parsed.ca {
            chain.extend(ca);
        }
        Ok(Self { key, chain })
    }

    fn from_pem(blocks: &[Pem], passphrase: &str) -> Result<Self> {
        let mut keys = blocks.iter().filter(|b| b.tag().ends_with("PRIVATE KEY"));
        let key_block = keys
            .next()
            .ok_or_else(|| bundle_error("bundle contains no private key"))?;
        if keys.next().is_some() {
            return Err(bundle_error("bundle contains more than one private key"));
        }
        let key = decode_private_key(key_block.contents(), passphrase)?;

        let chain = blocks
            .iter()
            .filter(|b| b.tag() == "CERTIFICATE")
            .map(|b| X509::from_der(b.contents()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if chain.is_empty() {
            return Err(bundle_error("bundle contains no certificate"));
        }

        Ok(Self { key, chain })
    }

    pub fn certificate_count(&self) -> usize {
        self.chain.len()
    }

    /// PKCS#8 key followed by the certificate chain, leaf first.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        let mut pem = self.key.private_key_to_pem_pkcs8()?;
        for cert in &self.chain {
            pem.extend(cert.to_pem()?);
        }
        Ok(pem)
    }

    pub fn to_identity(&self) -> Result<reqwest::Identity> {
        let pem = self.to_pem()?;
        reqwest::Identity::from_pem(&pem).map_err(|e| ClientError::TlsError(e.to_string()))
    }
}

/// Read a bundle from disk and turn it into a TLS identity.
pub async fn load_identity(
    path: &std::path::Path,
    password: Option<&SecretString>,
) -> Result<reqwest::Identity> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        ClientError::CertificateBundle(format!("cannot read {}: {e}", path.display()))
    })?;
    let bundle = CertificateBundle::from_bytes(&data, password)?;
    tracing::debug!(
        path = %path.display(),
        certificates = bundle.certificate_count(),
        "Loaded client certificate bundle"
    );
    bundle.to_identity()
}

fn bundle_error(message: &str) -> ClientError {
    ClientError::CertificateBundle(message.to_string())
}

fn decode_private_key(der: &[u8], passphrase: &str) -> Result<PKey<Private>> {
    if let Ok(rsa) = Rsa::private_key_from_der(der) {
        return Ok(PKey::from_rsa(rsa)?);
    }
    if let Ok(key) = PKey::private_key_from_pkcs8(der) {
        return Ok(key);
    }
    if let Ok(key) = PKey::private_key_from_pkcs8_passphrase(der, passphrase.as_bytes()) {
        return Ok(key);
    }
    if let Ok(ec) = EcKey::private_key_from_der(der) {
        return Ok(PKey::from_ec_key(ec)?);
    }
    Err(bundle_error("private key is not PKCS#1, PKCS#8 or EC"))
}
