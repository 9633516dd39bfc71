//! Signing key material loaded from a PEM certificate and private key.
//!
//! The registry identifies the signing key by the libtrust key id: the
//! SHA-256 of the DER-encoded SubjectPublicKeyInfo, truncated to 240 bits
//! and rendered as twelve colon-separated base32 quartets. The JWS `alg`
//! is chosen from the key type (RSA, or EC by named curve), never from
//! configuration.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_CURVE_P384: &str = "1.3.132.0.34";
const OID_CURVE_P521: &str = "1.3.132.0.35";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse certificate: {0}")]
    BadCertificate(String),
    #[error("unsupported public key algorithm {0}")]
    UnsupportedKeyType(String),
    #[error("unsupported elliptic curve {0}")]
    UnsupportedCurve(String),
    #[error("could not load private key: {0}")]
    BadPrivateKey(#[from] jsonwebtoken::errors::Error),
}

/// An immutable signing key. Built once at startup, shared behind `Arc`.
pub struct SigningKey {
    algorithm: Algorithm,
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Load a keypair from a PEM certificate and PEM private key file.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, KeyError> {
        let cert_pem = std::fs::read(cert_path).map_err(|source| KeyError::Io {
            path: cert_path.display().to_string(),
            source,
        })?;
        let key_pem = std::fs::read(key_path).map_err(|source| KeyError::Io {
            path: key_path.display().to_string(),
            source,
        })?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, KeyError> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem)
            .map_err(|err| KeyError::BadCertificate(err.to_string()))?;
        let cert = pem
            .parse_x509()
            .map_err(|err| KeyError::BadCertificate(err.to_string()))?;
        let spki = cert.public_key();

        let algorithm = algorithm_for(spki)?;
        let key_id = libtrust_key_id(spki.raw);
        let public_key_der = spki.subject_public_key.data.as_ref().to_vec();

        let (encoding_key, decoding_key) = match algorithm {
            Algorithm::RS256 => (
                EncodingKey::from_rsa_pem(key_pem)?,
                // For RSA the SPKI bit string payload is the PKCS#1
                // RSAPublicKey structure.
                DecodingKey::from_rsa_der(&public_key_der),
            ),
            _ => (
                EncodingKey::from_ec_pem(key_pem)?,
                // For EC keys the bit string payload is the uncompressed
                // curve point.
                DecodingKey::from_ec_der(&public_key_der),
            ),
        };

        Ok(Self {
            algorithm,
            key_id,
            encoding_key,
            decoding_key,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

fn algorithm_for(spki: &x509_parser::x509::SubjectPublicKeyInfo<'_>) -> Result<Algorithm, KeyError> {
    let key_oid = spki.algorithm.algorithm.to_id_string();
    match key_oid.as_str() {
        OID_RSA_ENCRYPTION => Ok(Algorithm::RS256),
        OID_EC_PUBLIC_KEY => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|oid| oid.to_id_string())
                .ok_or_else(|| KeyError::UnsupportedCurve("<missing>".to_string()))?;
            match curve_oid.as_str() {
                OID_CURVE_P256 => Ok(Algorithm::ES256),
                OID_CURVE_P384 => Ok(Algorithm::ES384),
                // P-521 would need ES512, which the JWT stack does not
                // offer; refuse it at startup rather than sign badly.
                OID_CURVE_P521 => Err(KeyError::UnsupportedCurve("P-521".to_string())),
                other => Err(KeyError::UnsupportedCurve(other.to_string())),
            }
        }
        other => Err(KeyError::UnsupportedKeyType(other.to_string())),
    }
}

/// SHA-256 over the SPKI DER, truncated to 240 bits, base32 without
/// padding, grouped into quartets separated by colons.
fn libtrust_key_id(spki_der: &[u8]) -> String {
    let digest = Sha256::digest(spki_der);
    let encoded = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &digest[..30]);
    let mut key_id = String::with_capacity(encoded.len() + encoded.len() / 4);
    for (index, ch) in encoded.chars().enumerate() {
        if index > 0 && index % 4 == 0 {
            key_id.push(':');
        }
        key_id.push(ch);
    }
    key_id
}
