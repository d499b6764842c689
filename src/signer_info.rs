//! Per-signer records of a SignedData.

use core::hash::{Hash, Hasher};
use std::time::SystemTime;

use der::asn1::{AnyRef, ContextSpecific, ContextSpecificRef, OctetString, OctetStringRef};
use der::{
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, TagMode,
    TagNumber, Writer,
};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use subtle::ConstantTimeEq;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;
use x509_cert::Certificate;

use crate::algorithms::DigestAlgorithm;
use crate::asn1::{self, IssuerAndSerialNumber, SetOf, SetOfRef};
use crate::attributes::{Attribute, Attributes};
use crate::errors::{Error, Result};
use crate::keys::{KeyType, PrivateKey, PublicKey};
use crate::registry;

const SIGNED_ATTRIBUTES: TagNumber = TagNumber::N0;
const UNSIGNED_ATTRIBUTES: TagNumber = TagNumber::N1;

/// ```text
/// SignerInfo ::= SEQUENCE {
///   version                   Version,
///   issuerAndSerialNumber     IssuerAndSerialNumber,
///   digestAlgorithm           DigestAlgorithmIdentifier,
///   authenticatedAttributes   [0] IMPLICIT Attributes OPTIONAL,
///   digestEncryptionAlgorithm DigestEncryptionAlgorithmIdentifier,
///   encryptedDigest           EncryptedDigest,
///   unauthenticatedAttributes [1] IMPLICIT Attributes OPTIONAL }
/// ```
///
/// A SignerInfo built with [`SignerInfo::new`] holds its private key until
/// the message is finalised; the key is dropped as soon as the signature
/// has been produced.
#[derive(Clone, Debug)]
pub struct SignerInfo {
    version: u8,
    issuer_and_serial: IssuerAndSerialNumber,
    digest_algorithm: AlgorithmIdentifierOwned,
    signed_attributes: Option<Attributes>,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: Vec<u8>,
    unsigned_attributes: Option<Attributes>,
    key: Option<PrivateKey>,
}

impl SignerInfo {
    /// Bind `cert` and `key` with the requested digest.
    ///
    /// RSA keys use `digest` with `rsaEncryption`. DSA and EC keys always
    /// use SHA-1 (`dsaWithSHA1`, `ecdsa-with-SHA1`).
    pub fn new(cert: &Certificate, key: PrivateKey, digest: DigestAlgorithm) -> Result<Self> {
        if !key.matches_certificate(cert) {
            return Err(Error::PrivateKeyDoesNotMatchCertificate);
        }

        let (digest, signature_algorithm) = match key.key_type() {
            KeyType::Rsa => (
                digest,
                AlgorithmIdentifierOwned {
                    oid: registry::RSA_ENCRYPTION,
                    parameters: Some(AnyRef::NULL.into()),
                },
            ),
            KeyType::Dsa => (
                DigestAlgorithm::Sha1,
                AlgorithmIdentifierOwned {
                    oid: registry::DSA_WITH_SHA1,
                    parameters: None,
                },
            ),
            KeyType::Ec => (
                DigestAlgorithm::Sha1,
                AlgorithmIdentifierOwned {
                    oid: registry::ECDSA_WITH_SHA1,
                    parameters: None,
                },
            ),
        };

        Ok(SignerInfo {
            version: 1,
            issuer_and_serial: IssuerAndSerialNumber::from_certificate(cert),
            digest_algorithm: digest.algorithm_identifier(),
            signed_attributes: None,
            signature_algorithm,
            signature: Vec::new(),
            unsigned_attributes: None,
            key: Some(key),
        })
    }

    /// Syntax version, always 1.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Signer certificate reference.
    pub fn issuer_and_serial(&self) -> &IssuerAndSerialNumber {
        &self.issuer_and_serial
    }

    /// Issuer of the signer certificate.
    pub fn issuer(&self) -> &Name {
        &self.issuer_and_serial.issuer
    }

    /// Serial number of the signer certificate.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.issuer_and_serial.serial_number
    }

    /// Digest algorithm, if the engine supports it.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        DigestAlgorithm::from_algorithm_identifier(&self.digest_algorithm)
    }

    /// Digest AlgorithmIdentifier as stored.
    pub fn digest_algorithm_identifier(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }

    /// Digest encryption algorithm.
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.signature_algorithm
    }

    /// Encrypted digest; empty until signed.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Authenticated attributes.
    pub fn signed_attributes(&self) -> Option<&Attributes> {
        self.signed_attributes.as_ref()
    }

    /// Unauthenticated attributes.
    pub fn unsigned_attributes(&self) -> Option<&Attributes> {
        self.unsigned_attributes.as_ref()
    }

    /// Whether a private key is still bound, i.e. the signature is pending.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Add or replace an authenticated attribute.
    pub fn add_signed_attribute(&mut self, attr: Attribute) -> &mut Self {
        self.signed_attributes
            .get_or_insert_with(Attributes::new)
            .insert(attr);
        self
    }

    /// Add or replace an unauthenticated attribute.
    pub fn add_attribute(&mut self, attr: Attribute) -> &mut Self {
        self.unsigned_attributes
            .get_or_insert_with(Attributes::new)
            .insert(attr);
        self
    }

    /// Authenticated attribute of type `oid`.
    pub fn signed_attribute(&self, oid: &const_oid::ObjectIdentifier) -> Option<&Attribute> {
        self.signed_attributes.as_ref()?.get(oid)
    }

    /// Value of the signing-time attribute.
    pub fn signing_time(&self) -> Option<SystemTime> {
        let value = self.signed_attribute(&registry::SIGNING_TIME)?.value()?;
        asn1::from_any::<Time>(value).ok().map(|t| t.to_system_time())
    }

    /// Value of the message-digest attribute.
    pub fn message_digest(&self) -> Option<Vec<u8>> {
        let value = self.signed_attribute(&registry::MESSAGE_DIGEST)?.value()?;
        asn1::from_any::<OctetString>(value).ok().map(OctetString::into_bytes)
    }

    /// Whether this record names `cert` by issuer and serial number.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.issuer_and_serial.matches(cert)
    }

    fn uses_signed_attributes(&self) -> bool {
        self.signed_attributes.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Sign the content digest, releasing the bound key.
    ///
    /// With signed attributes present, signing-time (unless already set) and
    /// message-digest are added and the sorted attribute set is signed.
    /// Otherwise the content digest itself is signed.
    pub(crate) fn sign(&mut self, rng: &mut impl CryptoRngCore, content_digest: &[u8]) -> Result<()> {
        let key = self.key.take().ok_or(Error::NoSigners)?;
        let algorithm = self.digest_algorithm()?;

        let signature = match self.signed_attributes.as_mut() {
            Some(attrs) if !attrs.is_empty() => {
                if !attrs.contains(&registry::SIGNING_TIME) {
                    attrs.insert(Attribute::signing_time(SystemTime::now())?);
                }
                attrs.insert(Attribute::message_digest(content_digest)?);
                attrs.sort_canonical()?;
                let signed = algorithm.digest(&attrs.to_signed_der()?);
                key.sign_digest(rng, algorithm, &signed)?
            }
            _ => key.sign_digest(rng, algorithm, content_digest)?,
        };

        tracing::debug!(
            digest = %algorithm,
            signed_attributes = self.uses_signed_attributes(),
            "signer info signed"
        );
        self.signature = signature;
        Ok(())
    }

    /// Check the signature against the recomputed content digest.
    pub(crate) fn verify(&self, public: &PublicKey, content_digest: &[u8]) -> Result<()> {
        let algorithm = self.digest_algorithm()?;
        match self.signed_attributes.as_ref() {
            Some(attrs) if !attrs.is_empty() => {
                let expected = self.message_digest().ok_or(Error::NotVerified)?;
                if !bool::from(expected.as_slice().ct_eq(content_digest)) {
                    tracing::debug!("message digest attribute mismatch");
                    return Err(Error::NotVerified);
                }
                let signed = algorithm.digest(&attrs.to_signed_der()?);
                public.verify_digest(algorithm, &signed, &self.signature)
            }
            _ => public.verify_digest(algorithm, content_digest, &self.signature),
        }
    }

    #[cfg(test)]
    pub(crate) fn signature_mut(&mut self) -> &mut Vec<u8> {
        &mut self.signature
    }
}

fn decode_attributes<'a, R: Reader<'a>>(
    reader: &mut R,
    tag_number: TagNumber,
) -> der::Result<Option<Attributes>> {
    Ok(
        ContextSpecific::<SetOf<Attribute>>::decode_implicit(reader, tag_number)?
            .map(|field| Attributes::from_vec(field.value.0)),
    )
}

fn attributes_len(tag_number: TagNumber, attrs: Option<&Attributes>) -> der::Result<Length> {
    match attrs {
        Some(attrs) => ContextSpecificRef {
            tag_number,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(attrs.as_slice()),
        }
        .encoded_len(),
        None => Ok(Length::ZERO),
    }
}

fn encode_attributes(
    tag_number: TagNumber,
    attrs: Option<&Attributes>,
    writer: &mut impl Writer,
) -> der::Result<()> {
    match attrs {
        Some(attrs) => ContextSpecificRef {
            tag_number,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(attrs.as_slice()),
        }
        .encode(writer),
        None => Ok(()),
    }
}

impl<'a> DecodeValue<'a> for SignerInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let version = reader.decode()?;
            let issuer_and_serial = reader.decode()?;
            let digest_algorithm = reader.decode()?;
            let signed_attributes = decode_attributes(reader, SIGNED_ATTRIBUTES)?;
            let signature_algorithm = reader.decode()?;
            let signature = OctetString::decode(reader)?.into_bytes();
            let unsigned_attributes = decode_attributes(reader, UNSIGNED_ATTRIBUTES)?;
            Ok(SignerInfo {
                version,
                issuer_and_serial,
                digest_algorithm,
                signed_attributes,
                signature_algorithm,
                signature,
                unsigned_attributes,
                key: None,
            })
        })
    }
}

impl EncodeValue for SignerInfo {
    fn value_len(&self) -> der::Result<Length> {
        asn1::total_len(&[
            self.version.encoded_len()?,
            self.issuer_and_serial.encoded_len()?,
            self.digest_algorithm.encoded_len()?,
            attributes_len(SIGNED_ATTRIBUTES, self.signed_attributes.as_ref())?,
            self.signature_algorithm.encoded_len()?,
            OctetStringRef::new(&self.signature)?.encoded_len()?,
            attributes_len(UNSIGNED_ATTRIBUTES, self.unsigned_attributes.as_ref())?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        self.issuer_and_serial.encode(writer)?;
        self.digest_algorithm.encode(writer)?;
        encode_attributes(SIGNED_ATTRIBUTES, self.signed_attributes.as_ref(), writer)?;
        self.signature_algorithm.encode(writer)?;
        OctetStringRef::new(&self.signature)?.encode(writer)?;
        encode_attributes(UNSIGNED_ATTRIBUTES, self.unsigned_attributes.as_ref(), writer)
    }
}

impl<'a> Sequence<'a> for SignerInfo {}

impl PartialEq for SignerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.issuer_and_serial == other.issuer_and_serial
            && self.digest_algorithm == other.digest_algorithm
            && self.signed_attributes == other.signed_attributes
            && self.signature_algorithm == other.signature_algorithm
            && self.signature == other.signature
            && self.unsigned_attributes == other.unsigned_attributes
    }
}

impl Eq for SignerInfo {}

impl Hash for SignerInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.issuer_and_serial.to_der().ok().hash(state);
        self.digest_algorithm.oid.hash(state);
        self.signature.hash(state);
    }
}
