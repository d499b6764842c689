use der::asn1::{OctetString, OctetStringRef};
use der::{Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Writer};
use spki::AlgorithmIdentifierOwned;

use super::Content;
use crate::algorithms::DigestAlgorithm;
use crate::asn1::total_len;

/// ```text
/// DigestedData ::= SEQUENCE {
///   version          Version,
///   digestAlgorithm  DigestAlgorithmIdentifier,
///   contentInfo      ContentInfo,
///   digest           Digest }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestData {
    pub(crate) version: u8,
    pub(crate) digest_algorithm: AlgorithmIdentifierOwned,
    pub(crate) content: Box<Content>,
    pub(crate) digest: Vec<u8>,
}

impl Default for DigestData {
    fn default() -> Self {
        DigestData {
            version: 0,
            digest_algorithm: DigestAlgorithm::Sha1.algorithm_identifier(),
            content: Box::new(Content::Data(None)),
            digest: Vec::new(),
        }
    }
}

impl DigestData {
    /// Syntax version, always 0.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Algorithm the digest was computed with.
    pub fn digest_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }

    /// Digested payload.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Stored digest value.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

impl<'a> DecodeValue<'a> for DigestData {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            Ok(DigestData {
                version: reader.decode()?,
                digest_algorithm: reader.decode()?,
                content: super::decode_inner(reader)?,
                digest: OctetString::decode(reader)?.into_bytes(),
            })
        })
    }
}

impl EncodeValue for DigestData {
    fn value_len(&self) -> der::Result<Length> {
        total_len(&[
            self.version.encoded_len()?,
            self.digest_algorithm.encoded_len()?,
            self.content.encoded_len()?,
            OctetStringRef::new(&self.digest)?.encoded_len()?,
        ])
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.version.encode(writer)?;
        self.digest_algorithm.encode(writer)?;
        self.content.encode(writer)?;
        OctetStringRef::new(&self.digest)?.encode(writer)
    }
}

impl<'a> Sequence<'a> for DigestData {}
