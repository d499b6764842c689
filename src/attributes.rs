//! PKCS#9 attributes attached to a SignerInfo.

use std::time::SystemTime;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, OctetString, UtcTime};
use der::{Encode, Sequence};
use spki::AlgorithmIdentifierOwned;

use crate::algorithms::ContentCipher;
use crate::asn1::{self, SetOf};
use crate::errors::Result;
use crate::registry;

/// ```text
/// Attribute ::= SEQUENCE {
///   type   OBJECT IDENTIFIER,
///   values SET OF ANY }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Attribute {
    /// Attribute type.
    pub oid: ObjectIdentifier,
    pub(crate) values: SetOf<Any>,
}

impl Attribute {
    /// Single-valued attribute.
    pub fn new(oid: ObjectIdentifier, value: Any) -> Self {
        Attribute {
            oid,
            values: SetOf(vec![value]),
        }
    }

    /// Every value, in stored order.
    pub fn values(&self) -> &[Any] {
        &self.values.0
    }

    /// First value, which is the only one for every PKCS#9 attribute the
    /// engine writes.
    pub fn value(&self) -> Option<&Any> {
        self.values.0.first()
    }

    /// PKCS#9 `contentType`.
    pub fn content_type(content_type: ObjectIdentifier) -> Result<Self> {
        Ok(Attribute::new(registry::CONTENT_TYPE, asn1::to_any(&content_type)?))
    }

    /// PKCS#9 `messageDigest`.
    pub fn message_digest(digest: &[u8]) -> Result<Self> {
        Ok(Attribute::new(
            registry::MESSAGE_DIGEST,
            asn1::to_any(&OctetString::new(digest)?)?,
        ))
    }

    /// PKCS#9 `signingTime`, written as UTCTime.
    pub fn signing_time(time: SystemTime) -> Result<Self> {
        Ok(Attribute::new(
            registry::SIGNING_TIME,
            asn1::to_any(&UtcTime::from_system_time(time)?)?,
        ))
    }

    /// SMIMECapabilities listing the given ciphers in order of preference.
    pub fn smime_capabilities(ciphers: &[ContentCipher]) -> Result<Self> {
        let caps = ciphers
            .iter()
            .map(|&cipher| smime_capability(cipher))
            .collect::<Result<Vec<_>>>()?;
        Ok(Attribute::new(registry::SMIME_CAPABILITIES, asn1::to_any(&caps)?))
    }
}

/// Capabilities announced by [`sign`](crate::sign), strongest first.
pub const DEFAULT_SMIME_CAPABILITIES: [ContentCipher; 5] = [
    ContentCipher::DesEde3Cbc,
    ContentCipher::Rc2Cbc { effective_bits: 128 },
    ContentCipher::Rc2Cbc { effective_bits: 64 },
    ContentCipher::Rc2Cbc { effective_bits: 40 },
    ContentCipher::DesCbc,
];

/// RC2 capabilities carry the key size as an INTEGER; others have no parameters.
fn smime_capability(cipher: ContentCipher) -> Result<AlgorithmIdentifierOwned> {
    let parameters = match cipher {
        ContentCipher::Rc2Cbc { effective_bits } => Some(asn1::to_any(&u32::from(effective_bits))?),
        _ => None,
    };
    Ok(AlgorithmIdentifierOwned {
        oid: cipher.oid(),
        parameters,
    })
}

/// Attributes keyed by type OID, in insertion order.
///
/// Inserting a type that is already present replaces its value in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous attribute of the same type.
    pub fn insert(&mut self, attr: Attribute) -> Option<Attribute> {
        match self.0.iter_mut().find(|a| a.oid == attr.oid) {
            Some(slot) => Some(core::mem::replace(slot, attr)),
            None => {
                self.0.push(attr);
                None
            }
        }
    }

    /// Attribute of type `oid`.
    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.0.iter().find(|a| a.oid == *oid)
    }

    /// Remove and return the attribute of type `oid`.
    pub fn remove(&mut self, oid: &ObjectIdentifier) -> Option<Attribute> {
        let pos = self.0.iter().position(|a| a.oid == *oid)?;
        Some(self.0.remove(pos))
    }

    /// Whether an attribute of type `oid` is present.
    pub fn contains(&self, oid: &ObjectIdentifier) -> bool {
        self.get(oid).is_some()
    }

    /// Attributes in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encoding that signatures are computed over: a DER `SET OF` with
    /// elements sorted by encoding, independent of insertion order.
    pub fn to_signed_der(&self) -> Result<Vec<u8>> {
        Ok(asn1::der_sorted_set(&self.0)?)
    }

    /// Reorder into DER set order so the transmitted order equals the
    /// signed order.
    pub(crate) fn sort_canonical(&mut self) -> Result<()> {
        let mut keyed = self
            .0
            .drain(..)
            .map(|attr| Ok((attr.to_der()?, attr)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.0 = keyed.into_iter().map(|(_, attr)| attr).collect();
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[Attribute] {
        &self.0
    }

    pub(crate) fn from_vec(attrs: Vec<Attribute>) -> Self {
        Attributes(attrs)
    }
}
