//! Certificate chain validation used when verifying signer certificates.
//!
//! [`ChainValidator`] is the seam [`verify`](crate::verify) calls through.
//! [`TrustStore`] is a small reference implementation: it chains by issuer
//! name, checks signatures, validity windows, the S/MIME extended key usage
//! and revocation against the message's CRLs. It does not implement RFC 5280
//! policy, name constraint or basic constraint processing, and CRL
//! signatures are not checked.

use std::time::SystemTime;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::crl::CertificateList;
use x509_cert::ext::pkix::ExtendedKeyUsage;
use x509_cert::Certificate;

use crate::algorithms::DigestAlgorithm;
use crate::keys::PublicKey;
use crate::registry;

/// Maximum number of issuers followed above the leaf.
const DEFAULT_MAX_DEPTH: usize = 100;

/// What the validated certificate is going to be used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// S/MIME signing, the default.
    #[default]
    SmimeSign,
    /// S/MIME encryption.
    SmimeEncrypt,
    /// No purpose check.
    Any,
}

/// Chain validation failure, displayed with OpenSSL's diagnostic strings.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ChainError {
    /// No issuer for the leaf among the known certificates.
    #[error("unable to get local issuer certificate")]
    UnableToGetIssuerCertLocally,

    /// Chain ends at a certificate that is not a trust anchor.
    #[error("unable to get issuer certificate")]
    UnableToGetIssuerCert,

    /// Untrusted self-signed leaf.
    #[error("self signed certificate")]
    DepthZeroSelfSignedCert,

    /// Untrusted self-signed certificate above the leaf.
    #[error("self signed certificate in certificate chain")]
    SelfSignedCertInChain,

    /// A certificate signature did not verify.
    #[error("certificate signature failure")]
    CertSignatureFailure,

    /// Issuer public key could not be decoded.
    #[error("unable to decode issuer public key")]
    UnableToDecodeIssuerPublicKey,

    /// Validation time is before notBefore.
    #[error("certificate is not yet valid")]
    CertNotYetValid,

    /// Validation time is after notAfter.
    #[error("certificate has expired")]
    CertHasExpired,

    /// Serial number listed in a CRL from the issuer.
    #[error("certificate revoked")]
    CertRevoked,

    /// Extended key usage excludes the requested purpose.
    #[error("unsupported certificate purpose")]
    InvalidPurpose,

    /// Chain deeper than the store allows.
    #[error("certificate chain too long")]
    CertChainTooLong,
}

/// Validates a certificate up to a trust anchor.
pub trait ChainValidator {
    /// Check `cert` for `purpose`. `untrusted` may supply intermediates;
    /// `crls` are consulted for revocation.
    fn validate(
        &self,
        cert: &Certificate,
        untrusted: &[Certificate],
        crls: &[CertificateList],
        purpose: Purpose,
    ) -> Result<(), ChainError>;
}

/// Trust anchors plus optional trusted intermediates.
#[derive(Clone, Debug)]
pub struct TrustStore {
    anchors: Vec<Certificate>,
    intermediates: Vec<Certificate>,
    time: Option<SystemTime>,
    max_depth: usize,
}

impl Default for TrustStore {
    fn default() -> Self {
        TrustStore {
            anchors: Vec::new(),
            intermediates: Vec::new(),
            time: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TrustStore {
    /// Empty store with the default depth limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `cert` as a root.
    pub fn add_anchor(&mut self, cert: Certificate) -> &mut Self {
        self.anchors.push(cert);
        self
    }

    /// Intermediate available to every validation.
    pub fn add_intermediate(&mut self, cert: Certificate) -> &mut Self {
        self.intermediates.push(cert);
        self
    }

    /// Validate at `time` instead of the current time.
    pub fn with_time(mut self, time: SystemTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Limit the number of issuers followed above the leaf.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Trust anchors.
    pub fn anchors(&self) -> &[Certificate] {
        &self.anchors
    }

    fn is_anchor(&self, cert: &Certificate) -> bool {
        self.anchors.iter().any(|anchor| anchor == cert)
    }

    fn check(&self, cert: &Certificate, crls: &[CertificateList], now: SystemTime) -> Result<(), ChainError> {
        let validity = &cert.tbs_certificate.validity;
        if now < validity.not_before.to_system_time() {
            return Err(ChainError::CertNotYetValid);
        }
        if now > validity.not_after.to_system_time() {
            return Err(ChainError::CertHasExpired);
        }
        if is_revoked(cert, crls) {
            return Err(ChainError::CertRevoked);
        }
        Ok(())
    }
}

impl ChainValidator for TrustStore {
    fn validate(
        &self,
        cert: &Certificate,
        untrusted: &[Certificate],
        crls: &[CertificateList],
        purpose: Purpose,
    ) -> Result<(), ChainError> {
        let now = self.time.unwrap_or_else(SystemTime::now);
        check_purpose(cert, purpose)?;

        let mut current = cert;
        for depth in 0..=self.max_depth {
            self.check(current, crls, now)?;
            if self.is_anchor(current) {
                return Ok(());
            }

            let tbs = &current.tbs_certificate;
            if tbs.issuer == tbs.subject {
                return Err(if depth == 0 {
                    ChainError::DepthZeroSelfSignedCert
                } else {
                    ChainError::SelfSignedCertInChain
                });
            }

            let mut candidates = self
                .anchors
                .iter()
                .chain(&self.intermediates)
                .chain(untrusted)
                .filter(|issuer| issuer.tbs_certificate.subject == tbs.issuer)
                .peekable();
            if candidates.peek().is_none() {
                return Err(if depth == 0 {
                    ChainError::UnableToGetIssuerCertLocally
                } else {
                    ChainError::UnableToGetIssuerCert
                });
            }

            let mut failure = ChainError::CertSignatureFailure;
            let mut issuer = None;
            for candidate in candidates {
                match check_signature(current, candidate) {
                    Ok(()) => {
                        issuer = Some(candidate);
                        break;
                    }
                    Err(err) => failure = err,
                }
            }
            current = match issuer {
                Some(issuer) => issuer,
                None => {
                    tracing::debug!(depth, error = %failure, "no candidate issuer verified");
                    return Err(failure);
                }
            };
        }
        Err(ChainError::CertChainTooLong)
    }
}

/// Digest named by a certificate signature algorithm.
fn signature_digest(oid: &ObjectIdentifier) -> Option<DigestAlgorithm> {
    match *oid {
        registry::SHA1_WITH_RSA | registry::DSA_WITH_SHA1 | registry::ECDSA_WITH_SHA1 => {
            Some(DigestAlgorithm::Sha1)
        }
        registry::SHA224_WITH_RSA | registry::ECDSA_WITH_SHA224 => Some(DigestAlgorithm::Sha224),
        registry::SHA256_WITH_RSA | registry::ECDSA_WITH_SHA256 => Some(DigestAlgorithm::Sha256),
        registry::SHA384_WITH_RSA | registry::ECDSA_WITH_SHA384 => Some(DigestAlgorithm::Sha384),
        registry::SHA512_WITH_RSA | registry::ECDSA_WITH_SHA512 => Some(DigestAlgorithm::Sha512),
        _ => None,
    }
}

fn check_signature(cert: &Certificate, issuer: &Certificate) -> Result<(), ChainError> {
    let algorithm =
        signature_digest(&cert.signature_algorithm.oid).ok_or(ChainError::CertSignatureFailure)?;
    let public = PublicKey::from_certificate(issuer)
        .map_err(|_| ChainError::UnableToDecodeIssuerPublicKey)?;
    let tbs = cert
        .tbs_certificate
        .to_der()
        .map_err(|_| ChainError::CertSignatureFailure)?;
    public
        .verify_digest(algorithm, &algorithm.digest(&tbs), cert.signature.raw_bytes())
        .map_err(|_| ChainError::CertSignatureFailure)
}

/// When extendedKeyUsage is present it must allow e-mail protection.
fn check_purpose(cert: &Certificate, purpose: Purpose) -> Result<(), ChainError> {
    if purpose == Purpose::Any {
        return Ok(());
    }
    let extensions = cert.tbs_certificate.extensions.as_deref().unwrap_or_default();
    let Some(ext) = extensions.iter().find(|ext| ext.extn_id == registry::EXT_KEY_USAGE) else {
        return Ok(());
    };
    let usage = ExtendedKeyUsage::from_der(ext.extn_value.as_bytes())
        .map_err(|_| ChainError::InvalidPurpose)?;
    if usage
        .0
        .iter()
        .any(|oid| *oid == registry::EMAIL_PROTECTION || *oid == registry::ANY_EXTENDED_KEY_USAGE)
    {
        Ok(())
    } else {
        Err(ChainError::InvalidPurpose)
    }
}

fn is_revoked(cert: &Certificate, crls: &[CertificateList]) -> bool {
    let tbs = &cert.tbs_certificate;
    crls.iter()
        .filter(|crl| crl.tbs_cert_list.issuer == tbs.issuer)
        .flat_map(|crl| crl.tbs_cert_list.revoked_certificates.iter().flatten())
        .any(|revoked| revoked.serial_number == tbs.serial_number)
}
