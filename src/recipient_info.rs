//! Per-recipient records of an EnvelopedData.

use core::hash::{Hash, Hasher};

use der::asn1::{AnyRef, OctetString, OctetStringRef};
use der::{Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Writer};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

use crate::asn1::{self, IssuerAndSerialNumber};
use crate::errors::{Error, Result};
use crate::keys::{KeyType, PublicKey};
use crate::registry;

/// ```text
/// RecipientInfo ::= SEQUENCE {
///   version                Version,
///   issuerAndSerialNumber  IssuerAndSerialNumber,
///   keyEncryptionAlgorithm KeyEncryptionAlgorithmIdentifier,
///   encryptedKey           EncryptedKey }
/// ```
#[derive(Clone, Debug)]
pub struct RecipientInfo {
    version: u8,
    issuer_and_serial: IssuerAndSerialNumber,
    key_encryption_algorithm: AlgorithmIdentifierOwned,
    encrypted_key: Vec<u8>,
    /// Recipient certificate; kept in memory only, used to wrap the key.
    cert: Option<Certificate>,
}

impl RecipientInfo {
    /// Record for `cert`. The key-wrap algorithm follows the certificate's
    /// public key: `rsaEncryption` for RSA, `dsaEncryption` for DSA.
    pub fn new(cert: &Certificate) -> Result<Self> {
        let spki = &cert.tbs_certificate.subject_public_key_info;
        let key_encryption_algorithm = match KeyType::from_oid(&spki.algorithm.oid)? {
            KeyType::Rsa => AlgorithmIdentifierOwned {
                oid: registry::RSA_ENCRYPTION,
                parameters: Some(AnyRef::NULL.into()),
            },
            KeyType::Dsa => AlgorithmIdentifierOwned {
                oid: registry::DSA,
                parameters: None,
            },
            KeyType::Ec => return Err(Error::UnsupportedAlgorithm),
        };

        Ok(RecipientInfo {
            version: 0,
            issuer_and_serial: IssuerAndSerialNumber::from_certificate(cert),
            key_encryption_algorithm,
            encrypted_key: Vec::new(),
            cert: Some(cert.clone()),
        })
    }

    /// Syntax version, always 0.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Recipient certificate reference.
    pub fn issuer_and_serial(&self) -> &IssuerAndSerialNumber {
        &self.issuer_and_serial
    }

    /// Key-wrap algorithm.
    pub fn key_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.key_encryption_algorithm
    }

    /// Wrapped content key; empty until the message is finalised.
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }

    /// Certificate bound by [`RecipientInfo::new`]. Parsed records have none.
    pub fn certificate(&self) -> Option<&Certificate> {
        self.cert.as_ref()
    }

    /// Whether this record names `cert` by issuer and serial number.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.issuer_and_serial.matches(cert)
    }

    /// Wrap `content_key` for the bound certificate.
    pub(crate) fn wrap(&mut self, rng: &mut impl CryptoRngCore, content_key: &[u8]) -> Result<()> {
        let cert = self.cert.as_ref().ok_or(Error::ErrorSettingCipher)?;
        self.encrypted_key = PublicKey::from_certificate(cert)?.wrap_key(rng, content_key)?;
        Ok(())
    }
}

impl<'a> DecodeValue<'a> for RecipientInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            Ok(RecipientInfo {
                version: reader.decode()?,
                issuer_and_serial: reader.decode()?,
                key_encryption_algorithm: reader.decode()?,
                encrypted_key: OctetString::decode(reader)?.into_bytes(),
                cert: None,
            })
        })
    }
}

impl EncodeValue for RecipientInfo {
    fn value_len(&self) -> der::Result<Length> {
        asn1::total_len(&[
            self.version.encoded_len()?,
            self.issuer_and_serial.encoded_len()?,
            self.key_encryption_algorithm.encoded_len()?,
            OctetStringRef::new(&self.encrypted_key)?.encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        self.issuer_and_serial.encode(writer)?;
        self.key_encryption_algorithm.encode(writer)?;
        OctetStringRef::new(&self.encrypted_key)?.encode(writer)
    }
}

impl<'a> Sequence<'a> for RecipientInfo {}

impl PartialEq for RecipientInfo {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.issuer_and_serial == other.issuer_and_serial
            && self.key_encryption_algorithm == other.key_encryption_algorithm
            && self.encrypted_key == other.encrypted_key
    }
}

impl Eq for RecipientInfo {}

impl Hash for RecipientInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.issuer_and_serial.to_der().ok().hash(state);
        self.encrypted_key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dsa_identity, identity, rng};

    #[test]
    fn dsa_recipient_cannot_wrap() {
        let (_, cert) = dsa_identity();
        let mut ri = RecipientInfo::new(cert).unwrap();
        assert_eq!(ri.key_encryption_algorithm().oid, registry::DSA);
        assert!(ri.matches(cert));
        assert!(matches!(
            ri.wrap(&mut rng(), &[0x11; 16]),
            Err(Error::ErrorSettingCipher)
        ));
        assert!(ri.encrypted_key().is_empty());
    }

    #[test]
    fn rsa_recipient_wraps_for_its_key() {
        let alice = identity(0);
        let mut ri = RecipientInfo::new(&alice.cert).unwrap();
        assert_eq!(ri.key_encryption_algorithm().oid, registry::RSA_ENCRYPTION);
        ri.wrap(&mut rng(), &[0x11; 16]).unwrap();
        let key = alice.private_key().unwrap_key(&mut rng(), ri.encrypted_key()).unwrap();
        assert_eq!(key.as_slice(), &[0x11; 16]);
    }
}
