//! Signer and recipient key material.
//!
//! RSA keys sign with PKCS#1 v1.5 and wrap content keys with PKCS#1 v1.5
//! encryption. DSA and ECDSA (P-256) keys sign prehashed digests and cannot
//! wrap keys.

use core::fmt;

use pkcs8::{DecodePrivateKey, DecodePublicKey, PrivateKeyInfo};
use rand_core::CryptoRngCore;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use signature::SignatureEncoding;
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::algorithms::DigestAlgorithm;
use crate::errors::{Error, Result};
use crate::registry;

/// Public key algorithm family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// RSA (`rsaEncryption`).
    Rsa,
    /// DSA (`dsaEncryption`).
    Dsa,
    /// ECDSA over P-256 (`id-ecPublicKey`).
    Ec,
}

impl KeyType {
    /// Key type named by a SubjectPublicKeyInfo algorithm OID.
    pub fn from_oid(oid: &const_oid::ObjectIdentifier) -> Result<Self> {
        match *oid {
            registry::RSA_ENCRYPTION => Ok(KeyType::Rsa),
            registry::DSA => Ok(KeyType::Dsa),
            registry::EC_PUBLIC_KEY => Ok(KeyType::Ec),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }
}

/// Private key bound to a SignerInfo or used to unwrap a content key.
#[derive(Clone)]
pub enum PrivateKey {
    /// RSA private key.
    Rsa(RsaPrivateKey),
    /// DSA private key.
    Dsa(dsa::SigningKey),
    /// P-256 private key.
    Ec(p256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Parse a PKCS#8 `PrivateKeyInfo`, dispatching on its algorithm.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        match KeyType::from_oid(&info.algorithm.oid)? {
            KeyType::Rsa => Ok(PrivateKey::Rsa(RsaPrivateKey::from_pkcs8_der(der)?)),
            KeyType::Dsa => Ok(PrivateKey::Dsa(dsa::SigningKey::from_pkcs8_der(der)?)),
            KeyType::Ec => Ok(PrivateKey::Ec(p256::ecdsa::SigningKey::from_pkcs8_der(der)?)),
        }
    }

    /// Parse a PEM `PRIVATE KEY` (PKCS#8) or `RSA PRIVATE KEY` (PKCS#1) document.
    #[cfg(feature = "pem")]
    pub fn from_pem(pem: &str) -> Result<Self> {
        use pkcs1::DecodeRsaPrivateKey;

        let pem = crate::pem::document(pem);
        match crate::pem::label(pem)? {
            "PRIVATE KEY" => {
                let (_, doc) = pkcs8::SecretDocument::from_pem(pem)?;
                Self::from_pkcs8_der(doc.as_bytes())
            }
            "RSA PRIVATE KEY" => Ok(PrivateKey::Rsa(RsaPrivateKey::from_pkcs1_pem(pem)?)),
            _ => Err(Error::Pem),
        }
    }

    /// Algorithm family of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Rsa(_) => KeyType::Rsa,
            PrivateKey::Dsa(_) => KeyType::Dsa,
            PrivateKey::Ec(_) => KeyType::Ec,
        }
    }

    /// Matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(RsaPublicKey::from(key)),
            PrivateKey::Dsa(key) => PublicKey::Dsa(key.verifying_key().clone()),
            PrivateKey::Ec(key) => PublicKey::Ec(key.verifying_key().clone()),
        }
    }

    /// Whether this key pairs with the public key in `cert`.
    pub fn matches_certificate(&self, cert: &Certificate) -> bool {
        match PublicKey::from_certificate(cert) {
            Ok(public) => self.public_key() == public,
            Err(_) => false,
        }
    }

    /// Sign an already computed digest.
    pub(crate) fn sign_digest(
        &self,
        rng: &mut impl CryptoRngCore,
        algorithm: DigestAlgorithm,
        digest: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            PrivateKey::Rsa(key) => key
                .sign_with_rng(rng, pkcs1v15_scheme(algorithm), digest)
                .map_err(|_| Error::Sign),
            PrivateKey::Dsa(key) => {
                let signature: dsa::Signature = key.sign_prehash(digest).map_err(|_| Error::Sign)?;
                Ok(signature.to_vec())
            }
            PrivateKey::Ec(key) => {
                let signature: p256::ecdsa::Signature =
                    key.sign_prehash(digest).map_err(|_| Error::Sign)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }

    /// Recover a content key wrapped by [`PublicKey::wrap_key`].
    pub(crate) fn unwrap_key(
        &self,
        rng: &mut impl CryptoRngCore,
        wrapped: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            PrivateKey::Rsa(key) => key
                .decrypt_blinded(rng, Pkcs1v15Encrypt, wrapped)
                .map(Zeroizing::new)
                .map_err(|_| Error::Decrypt),
            PrivateKey::Dsa(_) | PrivateKey::Ec(_) => Err(Error::UnsupportedAlgorithm),
        }
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(key: RsaPrivateKey) -> Self {
        PrivateKey::Rsa(key)
    }
}

impl From<dsa::SigningKey> for PrivateKey {
    fn from(key: dsa::SigningKey) -> Self {
        PrivateKey::Dsa(key)
    }
}

impl From<p256::ecdsa::SigningKey> for PrivateKey {
    fn from(key: p256::ecdsa::SigningKey) -> Self {
        PrivateKey::Ec(key)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.key_type()).finish()
    }
}

/// Public key taken from a certificate.
#[derive(Clone, Debug)]
pub enum PublicKey {
    /// RSA public key.
    Rsa(RsaPublicKey),
    /// DSA public key.
    Dsa(dsa::VerifyingKey),
    /// P-256 public key.
    Ec(p256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode a SubjectPublicKeyInfo.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = der::Encode::to_der(spki)?;
        match KeyType::from_oid(&spki.algorithm.oid)? {
            KeyType::Rsa => Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?)),
            KeyType::Dsa => Ok(PublicKey::Dsa(dsa::VerifyingKey::from_public_key_der(&der)?)),
            KeyType::Ec => Ok(PublicKey::Ec(p256::ecdsa::VerifyingKey::from_public_key_der(&der)?)),
        }
    }

    /// Subject public key of `cert`.
    pub fn from_certificate(cert: &Certificate) -> Result<Self> {
        Self::from_spki(&cert.tbs_certificate.subject_public_key_info)
    }

    /// Algorithm family of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Rsa(_) => KeyType::Rsa,
            PublicKey::Dsa(_) => KeyType::Dsa,
            PublicKey::Ec(_) => KeyType::Ec,
        }
    }

    /// Check `signature` over a digest computed with `algorithm`.
    pub(crate) fn verify_digest(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let verified = match self {
            PublicKey::Rsa(key) => key
                .verify(pkcs1v15_scheme(algorithm), digest, signature)
                .is_ok(),
            PublicKey::Dsa(key) => dsa::Signature::try_from(signature)
                .and_then(|sig| key.verify_prehash(digest, &sig))
                .is_ok(),
            PublicKey::Ec(key) => p256::ecdsa::Signature::from_der(signature)
                .and_then(|sig| key.verify_prehash(digest, &sig))
                .is_ok(),
        };
        if verified {
            Ok(())
        } else {
            Err(Error::NotVerified)
        }
    }

    /// Encrypt a content key for this recipient.
    pub(crate) fn wrap_key(&self, rng: &mut impl CryptoRngCore, key: &[u8]) -> Result<Vec<u8>> {
        match self {
            PublicKey::Rsa(public) => public
                .encrypt(rng, Pkcs1v15Encrypt, key)
                .map_err(|_| Error::ErrorSettingCipher),
            PublicKey::Dsa(_) => Err(Error::ErrorSettingCipher),
            PublicKey::Ec(_) => Err(Error::UnsupportedAlgorithm),
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PublicKey::Rsa(a), PublicKey::Rsa(b)) => a == b,
            (PublicKey::Dsa(a), PublicKey::Dsa(b)) => a.y() == b.y(),
            (PublicKey::Ec(a), PublicKey::Ec(b)) => a == b,
            _ => false,
        }
    }
}

fn pkcs1v15_scheme(algorithm: DigestAlgorithm) -> Pkcs1v15Sign {
    match algorithm {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    }
}
