//! Message content model: the six PKCS#7 content types.

mod digest;
mod enveloped;
mod signed;

pub use self::digest::DigestData;
pub use self::enveloped::{EncryptedContentInfo, EncryptedData, EnvelopedData};
pub use self::signed::{SignedAndEnvelopedData, SignedData};

use core::fmt;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, ContextSpecific, ContextSpecificRef, OctetString, OctetStringRef};
use der::{
    Decode, DecodeValue, Encode, EncodeValue, ErrorKind, Header, Length, Reader, Sequence, Tag,
    TagMode, TagNumber, Tagged, Writer,
};

use crate::errors::{Error, Result};
use crate::registry;

const CONTENT: TagNumber = TagNumber::N0;

/// PKCS#7 content type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// `pkcs7-data`.
    Data,
    /// `pkcs7-signedData`.
    Signed,
    /// `pkcs7-envelopedData`.
    Enveloped,
    /// `pkcs7-signedAndEnvelopedData`.
    SignedAndEnveloped,
    /// `pkcs7-digestData`.
    Digest,
    /// `pkcs7-encryptedData`.
    Encrypted,
}

impl ContentType {
    /// Content type OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            ContentType::Data => registry::PKCS7_DATA,
            ContentType::Signed => registry::PKCS7_SIGNED,
            ContentType::Enveloped => registry::PKCS7_ENVELOPED,
            ContentType::SignedAndEnveloped => registry::PKCS7_SIGNED_AND_ENVELOPED,
            ContentType::Digest => registry::PKCS7_DIGEST,
            ContentType::Encrypted => registry::PKCS7_ENCRYPTED,
        }
    }

    /// Content type named by `oid`, or [`Error::UnsupportedContentType`].
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            registry::PKCS7_DATA => Ok(ContentType::Data),
            registry::PKCS7_SIGNED => Ok(ContentType::Signed),
            registry::PKCS7_ENVELOPED => Ok(ContentType::Enveloped),
            registry::PKCS7_SIGNED_AND_ENVELOPED => Ok(ContentType::SignedAndEnveloped),
            registry::PKCS7_DIGEST => Ok(ContentType::Digest),
            registry::PKCS7_ENCRYPTED => Ok(ContentType::Encrypted),
            _ => Err(Error::UnsupportedContentType),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&registry::short_name(&self.oid()))
    }
}

/// A `ContentInfo`: exactly one content type together with its payload.
///
/// ```text
/// ContentInfo ::= SEQUENCE {
///   contentType ContentType,
///   content [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// Raw octets; `None` when the content is absent (detached).
    Data(Option<Vec<u8>>),
    /// SignedData.
    Signed(SignedData),
    /// EnvelopedData.
    Enveloped(EnvelopedData),
    /// SignedAndEnvelopedData.
    SignedAndEnveloped(SignedAndEnvelopedData),
    /// DigestedData.
    Digest(DigestData),
    /// EncryptedData.
    Encrypted(EncryptedData),
}

impl Content {
    /// Fresh, empty payload of `content_type`.
    pub fn new(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Data => Content::Data(None),
            ContentType::Signed => Content::Signed(SignedData::default()),
            ContentType::Enveloped => Content::Enveloped(EnvelopedData::default()),
            ContentType::SignedAndEnveloped => {
                Content::SignedAndEnveloped(SignedAndEnvelopedData::default())
            }
            ContentType::Digest => Content::Digest(DigestData::default()),
            ContentType::Encrypted => Content::Encrypted(EncryptedData::default()),
        }
    }

    /// Type of this payload.
    pub fn content_type(&self) -> ContentType {
        match self {
            Content::Data(_) => ContentType::Data,
            Content::Signed(_) => ContentType::Signed,
            Content::Enveloped(_) => ContentType::Enveloped,
            Content::SignedAndEnveloped(_) => ContentType::SignedAndEnveloped,
            Content::Digest(_) => ContentType::Digest,
            Content::Encrypted(_) => ContentType::Encrypted,
        }
    }

    /// Octets of a Data content.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Content::Data(data) => data.as_deref(),
            _ => None,
        }
    }
}

/// Decode an inner ContentInfo from its own TLV so reader types stay
/// bounded however deeply messages nest.
fn decode_inner<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<Box<Content>> {
    let tlv: Any = reader.decode()?;
    Ok(Box::new(Content::from_der(&tlv.to_der()?)?))
}

fn explicit<'a, T: Decode<'a>, R: Reader<'a>>(reader: &mut R) -> der::Result<Option<T>> {
    Ok(ContextSpecific::<T>::decode_explicit(reader, CONTENT)?.map(|field| field.value))
}

fn required<T>(value: Option<T>) -> der::Result<T> {
    value.ok_or_else(|| {
        Tag::ContextSpecific {
            constructed: true,
            number: CONTENT,
        }
        .value_error()
    })
}

fn explicit_len<T: EncodeValue + Tagged>(value: &T) -> der::Result<Length> {
    ContextSpecificRef {
        tag_number: CONTENT,
        tag_mode: TagMode::Explicit,
        value,
    }
    .encoded_len()
}

fn encode_explicit<T: EncodeValue + Tagged>(value: &T, writer: &mut impl Writer) -> der::Result<()> {
    ContextSpecificRef {
        tag_number: CONTENT,
        tag_mode: TagMode::Explicit,
        value,
    }
    .encode(writer)
}

impl<'a> DecodeValue<'a> for Content {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let oid: ObjectIdentifier = reader.decode()?;
            let content_type =
                ContentType::from_oid(&oid).map_err(|_| der::Error::from(ErrorKind::OidUnknown { oid }))?;

            Ok(match content_type {
                ContentType::Data => {
                    Content::Data(explicit::<OctetString, _>(reader)?.map(OctetString::into_bytes))
                }
                ContentType::Signed => Content::Signed(required(explicit(reader)?)?),
                ContentType::Enveloped => Content::Enveloped(required(explicit(reader)?)?),
                ContentType::SignedAndEnveloped => {
                    Content::SignedAndEnveloped(required(explicit(reader)?)?)
                }
                ContentType::Digest => Content::Digest(required(explicit(reader)?)?),
                ContentType::Encrypted => Content::Encrypted(required(explicit(reader)?)?),
            })
        })
    }
}

impl EncodeValue for Content {
    fn value_len(&self) -> der::Result<Length> {
        let content_len = match self {
            Content::Data(None) => Length::ZERO,
            Content::Data(Some(data)) => explicit_len(&OctetStringRef::new(data)?)?,
            Content::Signed(signed) => explicit_len(signed)?,
            Content::Enveloped(enveloped) => explicit_len(enveloped)?,
            Content::SignedAndEnveloped(sne) => explicit_len(sne)?,
            Content::Digest(digest) => explicit_len(digest)?,
            Content::Encrypted(encrypted) => explicit_len(encrypted)?,
        };
        self.content_type().oid().encoded_len()? + content_len
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.content_type().oid().encode(writer)?;
        match self {
            Content::Data(None) => Ok(()),
            Content::Data(Some(data)) => encode_explicit(&OctetStringRef::new(data)?, writer),
            Content::Signed(signed) => encode_explicit(signed, writer),
            Content::Enveloped(enveloped) => encode_explicit(enveloped, writer),
            Content::SignedAndEnveloped(sne) => encode_explicit(sne, writer),
            Content::Digest(digest) => encode_explicit(digest, writer),
            Content::Encrypted(encrypted) => encode_explicit(encrypted, writer),
        }
    }
}

impl<'a> Sequence<'a> for Content {}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn data_round_trip() {
        let content = Content::Data(Some(b"hello".to_vec()));
        let der = content.to_der().unwrap();
        assert_eq!(
            der,
            hex!("301406092a864886f70d010701a007040568656c6c6f")
        );
        assert_eq!(Content::from_der(&der).unwrap(), content);
    }

    #[test]
    fn absent_data_omits_content_field() {
        let der = Content::Data(None).to_der().unwrap();
        assert_eq!(der, hex!("300b06092a864886f70d010701"));
        assert_eq!(Content::from_der(&der).unwrap(), Content::Data(None));
    }

    #[test]
    fn unknown_content_type_is_a_parse_error() {
        // ContentInfo with OID 1.2.840.113549.1.7.99
        let der = hex!("300b06092a864886f70d010763");
        let err = Content::from_der(&der).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OidUnknown { .. }));
    }

    #[test]
    fn signed_without_content_is_rejected() {
        let der = hex!("300b06092a864886f70d010702");
        assert!(Content::from_der(&der).is_err());
    }

    #[test]
    fn fresh_content_of_every_type_round_trips() {
        for kind in [
            ContentType::Data,
            ContentType::Signed,
            ContentType::Digest,
            ContentType::Encrypted,
        ] {
            let content = Content::new(kind);
            assert_eq!(content.content_type(), kind);
            let der = content.to_der().unwrap();
            assert_eq!(Content::from_der(&der).unwrap().to_der().unwrap(), der);
        }
    }

    #[test]
    fn nested_content_round_trips() {
        let mut inner = SignedData::default();
        inner.content = Box::new(Content::Data(Some(b"inner".to_vec())));

        let mut outer = SignedData::default();
        outer.content = Box::new(Content::Signed(inner));

        let mut digest = DigestData::default();
        digest.content = Box::new(Content::Signed(outer));

        let content = Content::Digest(digest);
        let der = content.to_der().unwrap();
        let decoded = Content::from_der(&der).unwrap();
        assert_eq!(decoded, content);
        assert_eq!(decoded.to_der().unwrap(), der);

        let Content::Digest(digest) = decoded else {
            panic!("not digested");
        };
        let Content::Signed(outer) = digest.content() else {
            panic!("not signed");
        };
        let Content::Signed(inner) = outer.content() else {
            panic!("not nested");
        };
        assert_eq!(inner.content().data(), Some(&b"inner"[..]));
    }

    #[test]
    fn content_type_oids() {
        assert_eq!(ContentType::Signed.oid(), registry::PKCS7_SIGNED);
        assert_eq!(
            ContentType::from_oid(&registry::PKCS7_ENCRYPTED).unwrap(),
            ContentType::Encrypted
        );
        assert!(matches!(
            ContentType::from_oid(&registry::SHA1),
            Err(Error::UnsupportedContentType)
        ));
        assert_eq!(ContentType::Data.to_string(), "pkcs7-data");
    }
}
