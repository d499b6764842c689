use const_oid::ObjectIdentifier;
use der::asn1::{ContextSpecific, ContextSpecificRef, OctetString, OctetStringRef};
use der::{
    DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, TagMode, TagNumber, Writer,
};
use spki::AlgorithmIdentifierOwned;

use crate::algorithms::ContentCipher;
use crate::asn1::{total_len, SetOf, SetOfRef};
use crate::recipient_info::RecipientInfo;
use crate::registry;

const ENCRYPTED_CONTENT: TagNumber = TagNumber::N0;

/// ```text
/// EncryptedContentInfo ::= SEQUENCE {
///   contentType                ContentType,
///   contentEncryptionAlgorithm ContentEncryptionAlgorithmIdentifier,
///   encryptedContent           [0] IMPLICIT EncryptedContent OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct EncryptedContentInfo {
    pub(crate) content_type: ObjectIdentifier,
    pub(crate) algorithm: AlgorithmIdentifierOwned,
    pub(crate) encrypted_content: Option<Vec<u8>>,
    /// Cipher chosen for encryption; kept in memory only.
    pub(crate) cipher: Option<ContentCipher>,
}

impl Default for EncryptedContentInfo {
    fn default() -> Self {
        EncryptedContentInfo {
            content_type: registry::PKCS7_DATA,
            algorithm: AlgorithmIdentifierOwned {
                oid: ContentCipher::default().oid(),
                parameters: None,
            },
            encrypted_content: None,
            cipher: None,
        }
    }
}

impl EncryptedContentInfo {
    /// Type of the encrypted payload.
    pub fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }

    /// Cipher and its parameters.
    pub fn content_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.algorithm
    }

    /// Ciphertext, absent until the message is finalised.
    pub fn encrypted_content(&self) -> Option<&[u8]> {
        self.encrypted_content.as_deref()
    }

    pub(crate) fn set_cipher(&mut self, cipher: ContentCipher) {
        self.algorithm = AlgorithmIdentifierOwned {
            oid: cipher.oid(),
            parameters: None,
        };
        self.cipher = Some(cipher);
    }
}

impl PartialEq for EncryptedContentInfo {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type
            && self.algorithm == other.algorithm
            && self.encrypted_content == other.encrypted_content
    }
}

impl Eq for EncryptedContentInfo {}

impl<'a> DecodeValue<'a> for EncryptedContentInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            Ok(EncryptedContentInfo {
                content_type: reader.decode()?,
                algorithm: reader.decode()?,
                encrypted_content: ContextSpecific::<OctetString>::decode_implicit(
                    reader,
                    ENCRYPTED_CONTENT,
                )?
                .map(|field| field.value.into_bytes()),
                cipher: None,
            })
        })
    }
}

impl EncodeValue for EncryptedContentInfo {
    fn value_len(&self) -> der::Result<Length> {
        let content_len = match &self.encrypted_content {
            Some(bytes) => ContextSpecificRef {
                tag_number: ENCRYPTED_CONTENT,
                tag_mode: TagMode::Implicit,
                value: &OctetStringRef::new(bytes)?,
            }
            .encoded_len()?,
            None => Length::ZERO,
        };
        total_len(&[
            self.content_type.encoded_len()?,
            self.algorithm.encoded_len()?,
            content_len,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.content_type.encode(writer)?;
        self.algorithm.encode(writer)?;
        match &self.encrypted_content {
            Some(bytes) => ContextSpecificRef {
                tag_number: ENCRYPTED_CONTENT,
                tag_mode: TagMode::Implicit,
                value: &OctetStringRef::new(bytes)?,
            }
            .encode(writer),
            None => Ok(()),
        }
    }
}

impl<'a> Sequence<'a> for EncryptedContentInfo {}

/// ```text
/// EnvelopedData ::= SEQUENCE {
///   version              Version,
///   recipientInfos       RecipientInfos,
///   encryptedContentInfo EncryptedContentInfo }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopedData {
    pub(crate) version: u8,
    pub(crate) recipient_infos: Vec<RecipientInfo>,
    pub(crate) encrypted_content_info: EncryptedContentInfo,
}

impl Default for EnvelopedData {
    fn default() -> Self {
        EnvelopedData {
            version: 0,
            recipient_infos: Vec::new(),
            encrypted_content_info: EncryptedContentInfo::default(),
        }
    }
}

impl EnvelopedData {
    /// Syntax version, always 0.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Recipients, in stored order.
    pub fn recipient_infos(&self) -> &[RecipientInfo] {
        &self.recipient_infos
    }

    /// Encrypted payload.
    pub fn encrypted_content_info(&self) -> &EncryptedContentInfo {
        &self.encrypted_content_info
    }
}

impl<'a> DecodeValue<'a> for EnvelopedData {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            Ok(EnvelopedData {
                version: reader.decode()?,
                recipient_infos: reader.decode::<SetOf<_>>()?.0,
                encrypted_content_info: reader.decode()?,
            })
        })
    }
}

impl EncodeValue for EnvelopedData {
    fn value_len(&self) -> der::Result<Length> {
        total_len(&[
            self.version.encoded_len()?,
            SetOfRef(&self.recipient_infos).encoded_len()?,
            self.encrypted_content_info.encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        SetOfRef(&self.recipient_infos).encode(writer)?;
        self.encrypted_content_info.encode(writer)
    }
}

impl<'a> Sequence<'a> for EnvelopedData {}

/// ```text
/// EncryptedData ::= SEQUENCE {
///   version              Version,
///   encryptedContentInfo EncryptedContentInfo }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncryptedData {
    pub(crate) version: u8,
    pub(crate) encrypted_content_info: EncryptedContentInfo,
}

impl EncryptedData {
    /// Syntax version, always 0.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Encrypted payload.
    pub fn encrypted_content_info(&self) -> &EncryptedContentInfo {
        &self.encrypted_content_info
    }
}

impl<'a> DecodeValue<'a> for EncryptedData {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            Ok(EncryptedData {
                version: reader.decode()?,
                encrypted_content_info: reader.decode()?,
            })
        })
    }
}

impl EncodeValue for EncryptedData {
    fn value_len(&self) -> der::Result<Length> {
        total_len(&[
            self.version.encoded_len()?,
            self.encrypted_content_info.encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        self.encrypted_content_info.encode(writer)
    }
}

impl<'a> Sequence<'a> for EncryptedData {}
