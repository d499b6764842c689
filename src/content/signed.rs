use der::asn1::{ContextSpecific, ContextSpecificRef};
use der::{
    DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, TagMode, TagNumber, Writer,
};
use spki::AlgorithmIdentifierOwned;
use x509_cert::crl::CertificateList;
use x509_cert::Certificate;

use super::{Content, EncryptedContentInfo};
use crate::asn1::{total_len, SetOf, SetOfRef};
use crate::recipient_info::RecipientInfo;
use crate::signer_info::SignerInfo;

const CERTIFICATES: TagNumber = TagNumber::N0;
const CRLS: TagNumber = TagNumber::N1;

/// ```text
/// SignedData ::= SEQUENCE {
///   version          Version,
///   digestAlgorithms DigestAlgorithmIdentifiers,
///   contentInfo      ContentInfo,
///   certificates     [0] IMPLICIT ExtendedCertificatesAndCertificates OPTIONAL,
///   crls             [1] IMPLICIT CertificateRevocationLists OPTIONAL,
///   signerInfos      SignerInfos }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedData {
    pub(crate) version: u8,
    pub(crate) digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    pub(crate) content: Box<Content>,
    pub(crate) certificates: Option<Vec<Certificate>>,
    pub(crate) crls: Option<Vec<CertificateList>>,
    pub(crate) signer_infos: Vec<SignerInfo>,
}

impl Default for SignedData {
    fn default() -> Self {
        SignedData {
            version: 1,
            digest_algorithms: Vec::new(),
            content: Box::new(Content::Data(None)),
            certificates: None,
            crls: None,
            signer_infos: Vec::new(),
        }
    }
}

impl SignedData {
    /// Syntax version, always 1.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Digest algorithms used by the signers.
    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifierOwned] {
        &self.digest_algorithms
    }

    /// The signed payload.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Embedded certificates.
    pub fn certificates(&self) -> &[Certificate] {
        self.certificates.as_deref().unwrap_or_default()
    }

    /// Embedded revocation lists.
    pub fn crls(&self) -> &[CertificateList] {
        self.crls.as_deref().unwrap_or_default()
    }

    /// Signers, in stored order.
    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }
}

/// ```text
/// SignedAndEnvelopedData ::= SEQUENCE {
///   version              Version,
///   recipientInfos       RecipientInfos,
///   digestAlgorithms     DigestAlgorithmIdentifiers,
///   encryptedContentInfo EncryptedContentInfo,
///   certificates         [0] IMPLICIT ExtendedCertificatesAndCertificates OPTIONAL,
///   crls                 [1] IMPLICIT CertificateRevocationLists OPTIONAL,
///   signerInfos          SignerInfos }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedAndEnvelopedData {
    pub(crate) version: u8,
    pub(crate) recipient_infos: Vec<RecipientInfo>,
    pub(crate) digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    pub(crate) encrypted_content_info: EncryptedContentInfo,
    pub(crate) certificates: Option<Vec<Certificate>>,
    pub(crate) crls: Option<Vec<CertificateList>>,
    pub(crate) signer_infos: Vec<SignerInfo>,
}

impl Default for SignedAndEnvelopedData {
    fn default() -> Self {
        SignedAndEnvelopedData {
            version: 1,
            recipient_infos: Vec::new(),
            digest_algorithms: Vec::new(),
            encrypted_content_info: EncryptedContentInfo::default(),
            certificates: None,
            crls: None,
            signer_infos: Vec::new(),
        }
    }
}

impl SignedAndEnvelopedData {
    /// Syntax version, always 1.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Recipients, in stored order.
    pub fn recipient_infos(&self) -> &[RecipientInfo] {
        &self.recipient_infos
    }

    /// Digest algorithms used by the signers.
    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifierOwned] {
        &self.digest_algorithms
    }

    /// Encrypted payload.
    pub fn encrypted_content_info(&self) -> &EncryptedContentInfo {
        &self.encrypted_content_info
    }

    /// Embedded certificates.
    pub fn certificates(&self) -> &[Certificate] {
        self.certificates.as_deref().unwrap_or_default()
    }

    /// Embedded revocation lists.
    pub fn crls(&self) -> &[CertificateList] {
        self.crls.as_deref().unwrap_or_default()
    }

    /// Signers, in stored order.
    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }
}

/// Reads `[0]` certificates. A lone certificate under EXPLICIT `[0]` and a
/// one-element IMPLICIT `[0]` SET are the same bytes, so one reader covers both.
fn decode_certificates<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<Option<Vec<Certificate>>> {
    Ok(ContextSpecific::<SetOf<Certificate>>::decode_implicit(reader, CERTIFICATES)?
        .map(|field| field.value.0))
}

fn decode_crls<'a, R: Reader<'a>>(reader: &mut R) -> der::Result<Option<Vec<CertificateList>>> {
    Ok(ContextSpecific::<SetOf<CertificateList>>::decode_implicit(reader, CRLS)?
        .map(|field| field.value.0))
}

/// Writes `[0]` certificates the way OpenSSL does: one certificate as an
/// EXPLICIT `[0]`, several as an IMPLICIT `[0]` SET.
fn certificates_len(certs: Option<&Vec<Certificate>>) -> der::Result<Length> {
    match certs.map(Vec::as_slice) {
        None => Ok(Length::ZERO),
        Some([single]) => ContextSpecificRef {
            tag_number: CERTIFICATES,
            tag_mode: TagMode::Explicit,
            value: single,
        }
        .encoded_len(),
        Some(many) => ContextSpecificRef {
            tag_number: CERTIFICATES,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(many),
        }
        .encoded_len(),
    }
}

fn encode_certificates(
    certs: Option<&Vec<Certificate>>,
    writer: &mut impl Writer,
) -> der::Result<()> {
    match certs.map(Vec::as_slice) {
        None => Ok(()),
        Some([single]) => ContextSpecificRef {
            tag_number: CERTIFICATES,
            tag_mode: TagMode::Explicit,
            value: single,
        }
        .encode(writer),
        Some(many) => ContextSpecificRef {
            tag_number: CERTIFICATES,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(many),
        }
        .encode(writer),
    }
}

fn crls_len(crls: Option<&Vec<CertificateList>>) -> der::Result<Length> {
    match crls {
        Some(crls) => ContextSpecificRef {
            tag_number: CRLS,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(crls.as_slice()),
        }
        .encoded_len(),
        None => Ok(Length::ZERO),
    }
}

fn encode_crls(crls: Option<&Vec<CertificateList>>, writer: &mut impl Writer) -> der::Result<()> {
    match crls {
        Some(crls) => ContextSpecificRef {
            tag_number: CRLS,
            tag_mode: TagMode::Implicit,
            value: &SetOfRef(crls.as_slice()),
        }
        .encode(writer),
        None => Ok(()),
    }
}

impl<'a> DecodeValue<'a> for SignedData {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let version = reader.decode()?;
            let digest_algorithms = reader.decode::<SetOf<_>>()?.0;
            let content = super::decode_inner(reader)?;
            let certificates = decode_certificates(reader)?;
            let crls = decode_crls(reader)?;
            let signer_infos = reader.decode::<SetOf<_>>()?.0;
            Ok(SignedData {
                version,
                digest_algorithms,
                content,
                certificates,
                crls,
                signer_infos,
            })
        })
    }
}

impl EncodeValue for SignedData {
    fn value_len(&self) -> der::Result<Length> {
        total_len(&[
            self.version.encoded_len()?,
            SetOfRef(&self.digest_algorithms).encoded_len()?,
            self.content.encoded_len()?,
            certificates_len(self.certificates.as_ref())?,
            crls_len(self.crls.as_ref())?,
            SetOfRef(&self.signer_infos).encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        SetOfRef(&self.digest_algorithms).encode(writer)?;
        self.content.encode(writer)?;
        encode_certificates(self.certificates.as_ref(), writer)?;
        encode_crls(self.crls.as_ref(), writer)?;
        SetOfRef(&self.signer_infos).encode(writer)
    }
}

impl<'a> Sequence<'a> for SignedData {}

impl<'a> DecodeValue<'a> for SignedAndEnvelopedData {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let version = reader.decode()?;
            let recipient_infos = reader.decode::<SetOf<_>>()?.0;
            let digest_algorithms = reader.decode::<SetOf<_>>()?.0;
            let encrypted_content_info = reader.decode()?;
            let certificates = decode_certificates(reader)?;
            let crls = decode_crls(reader)?;
            let signer_infos = reader.decode::<SetOf<_>>()?.0;
            Ok(SignedAndEnvelopedData {
                version,
                recipient_infos,
                digest_algorithms,
                encrypted_content_info,
                certificates,
                crls,
                signer_infos,
            })
        })
    }
}

impl EncodeValue for SignedAndEnvelopedData {
    fn value_len(&self) -> der::Result<Length> {
        total_len(&[
            self.version.encoded_len()?,
            SetOfRef(&self.recipient_infos).encoded_len()?,
            SetOfRef(&self.digest_algorithms).encoded_len()?,
            self.encrypted_content_info.encoded_len()?,
            certificates_len(self.certificates.as_ref())?,
            crls_len(self.crls.as_ref())?,
            SetOfRef(&self.signer_infos).encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        SetOfRef(&self.recipient_infos).encode(writer)?;
        SetOfRef(&self.digest_algorithms).encode(writer)?;
        self.encrypted_content_info.encode(writer)?;
        encode_certificates(self.certificates.as_ref(), writer)?;
        encode_crls(self.crls.as_ref(), writer)?;
        SetOfRef(&self.signer_infos).encode(writer)
    }
}

impl<'a> Sequence<'a> for SignedAndEnvelopedData {}
