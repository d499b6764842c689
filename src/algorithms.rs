//! Digest and content-encryption algorithm identifiers.

use core::fmt;
use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, AnyRef, OctetString};
use der::{Decode, Encode, Sequence, Tag, Tagged};
use digest::DynDigest;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};
use crate::registry;

/// Message digest usable for signer digests and DigestedData.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-1.
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Algorithm OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => registry::SHA1,
            DigestAlgorithm::Sha224 => registry::SHA224,
            DigestAlgorithm::Sha256 => registry::SHA256,
            DigestAlgorithm::Sha384 => registry::SHA384,
            DigestAlgorithm::Sha512 => registry::SHA512,
        }
    }

    /// Digest named by `oid`, or [`Error::UnsupportedDigest`].
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            registry::SHA1 => Ok(DigestAlgorithm::Sha1),
            registry::SHA224 => Ok(DigestAlgorithm::Sha224),
            registry::SHA256 => Ok(DigestAlgorithm::Sha256),
            registry::SHA384 => Ok(DigestAlgorithm::Sha384),
            registry::SHA512 => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedDigest),
        }
    }

    /// Size of the digest output in bytes.
    pub fn output_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// AlgorithmIdentifier with NULL parameters, as OpenSSL writes them.
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::from(AnyRef::NULL)),
        }
    }

    /// Digest named by an AlgorithmIdentifier; parameters are ignored.
    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifierOwned) -> Result<Self> {
        Self::from_oid(&alg.oid)
    }

    pub(crate) fn new_hasher(self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            DigestAlgorithm::Sha224 => Box::new(sha2::Sha224::default()),
            DigestAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            DigestAlgorithm::Sha384 => Box::new(sha2::Sha384::default()),
            DigestAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }

    /// One-shot digest of `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.new_hasher();
        hasher.update(data);
        hasher.finalize().into_vec()
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        registry::oid_for_name(name)
            .ok_or(Error::UnsupportedDigest)
            .and_then(|oid| Self::from_oid(&oid))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&registry::short_name(&self.oid()))
    }
}

/// Symmetric cipher used to encrypt enveloped content. All modes are CBC
/// with PKCS#7 padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentCipher {
    /// Single DES.
    DesCbc,
    /// Three-key triple DES, the default.
    #[default]
    DesEde3Cbc,
    /// RC2 with the given effective key size in bits.
    Rc2Cbc { effective_bits: u16 },
    /// AES-128.
    Aes128Cbc,
    /// AES-192.
    Aes192Cbc,
    /// AES-256.
    Aes256Cbc,
}

impl ContentCipher {
    /// Cipher OID. Every RC2 size shares `rc2-cbc`.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            ContentCipher::DesCbc => registry::DES_CBC,
            ContentCipher::DesEde3Cbc => registry::DES_EDE3_CBC,
            ContentCipher::Rc2Cbc { .. } => registry::RC2_CBC,
            ContentCipher::Aes128Cbc => registry::AES_128_CBC,
            ContentCipher::Aes192Cbc => registry::AES_192_CBC,
            ContentCipher::Aes256Cbc => registry::AES_256_CBC,
        }
    }

    /// Content key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            ContentCipher::DesCbc => 8,
            ContentCipher::DesEde3Cbc => 24,
            ContentCipher::Rc2Cbc { effective_bits } => usize::from(effective_bits).div_ceil(8),
            ContentCipher::Aes128Cbc => 16,
            ContentCipher::Aes192Cbc => 24,
            ContentCipher::Aes256Cbc => 32,
        }
    }

    /// Block and IV size in bytes.
    pub fn block_size(self) -> usize {
        match self {
            ContentCipher::DesCbc | ContentCipher::DesEde3Cbc | ContentCipher::Rc2Cbc { .. } => 8,
            _ => 16,
        }
    }

    /// OpenSSL cipher name, e.g. `des-ede3-cbc` or `rc2-40-cbc`.
    pub fn name(self) -> String {
        match self {
            ContentCipher::Rc2Cbc { effective_bits: 128 } => "rc2-cbc".into(),
            ContentCipher::Rc2Cbc { effective_bits } => format!("rc2-{effective_bits}-cbc"),
            other => registry::lookup(&other.oid())
                .map(|n| n.long_name.to_owned())
                .unwrap_or_else(|| other.oid().to_string()),
        }
    }

    /// Fresh random content key. DES keys get odd parity.
    pub fn generate_key(self, rng: &mut impl CryptoRngCore) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; self.key_len()]);
        rng.fill_bytes(&mut key);
        if matches!(self, ContentCipher::DesCbc | ContentCipher::DesEde3Cbc) {
            set_odd_parity(&mut key);
        }
        key
    }

    /// Fresh random IV of one block.
    pub fn generate_iv(self, rng: &mut impl CryptoRngCore) -> Vec<u8> {
        let mut iv = vec![0u8; self.block_size()];
        rng.fill_bytes(&mut iv);
        iv
    }

    /// Content-encryption AlgorithmIdentifier carrying `iv`.
    pub fn algorithm_identifier(self, iv: &[u8]) -> Result<AlgorithmIdentifierOwned> {
        let parameters = match self {
            ContentCipher::Rc2Cbc { effective_bits } => Rc2CbcParameter {
                version: rc2_version(effective_bits),
                iv: OctetString::new(iv)?,
            }
            .to_der()?,
            _ => OctetString::new(iv)?.to_der()?,
        };
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::from_der(&parameters)?),
        })
    }

    /// Parse a content-encryption AlgorithmIdentifier.
    pub(crate) fn from_algorithm_identifier(alg: &AlgorithmIdentifierOwned) -> Result<CipherParams> {
        let params = alg.parameters.as_ref().ok_or(Error::ErrorSettingCipher)?;
        let params_der = params.to_der()?;
        let bare_iv = |cipher: ContentCipher| -> Result<CipherParams> {
            let iv = OctetString::from_der(&params_der)?;
            Ok(CipherParams {
                cipher,
                iv: iv.into_bytes(),
                bits_from_key: false,
            })
        };

        match alg.oid {
            registry::DES_CBC => bare_iv(ContentCipher::DesCbc),
            registry::DES_EDE3_CBC => bare_iv(ContentCipher::DesEde3Cbc),
            registry::AES_128_CBC => bare_iv(ContentCipher::Aes128Cbc),
            registry::AES_192_CBC => bare_iv(ContentCipher::Aes192Cbc),
            registry::AES_256_CBC => bare_iv(ContentCipher::Aes256Cbc),
            registry::RC2_CBC if params.tag() == Tag::Sequence => {
                let rc2 = Rc2CbcParameter::from_der(&params_der)?;
                Ok(CipherParams {
                    cipher: ContentCipher::Rc2Cbc {
                        effective_bits: rc2_effective_bits(rc2.version)?,
                    },
                    iv: rc2.iv.into_bytes(),
                    bits_from_key: false,
                })
            }
            // Bare IV: the effective key size follows the unwrapped key.
            registry::RC2_CBC => {
                let mut decoded = bare_iv(ContentCipher::Rc2Cbc { effective_bits: 128 })?;
                decoded.bits_from_key = true;
                Ok(decoded)
            }
            _ => Err(Error::UnsupportedCipher),
        }
    }
}

impl FromStr for ContentCipher {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        let rc2_bits = match lower.as_str() {
            "rc2-40-cbc" => Some(40),
            "rc2-64-cbc" => Some(64),
            "rc2-128-cbc" | "rc2-cbc" | "rc2" => Some(128),
            _ => None,
        };
        if let Some(effective_bits) = rc2_bits {
            return Ok(ContentCipher::Rc2Cbc { effective_bits });
        }

        match registry::oid_for_name(&lower).ok_or(Error::UnsupportedCipher)? {
            registry::DES_CBC => Ok(ContentCipher::DesCbc),
            registry::DES_EDE3_CBC => Ok(ContentCipher::DesEde3Cbc),
            registry::AES_128_CBC => Ok(ContentCipher::Aes128Cbc),
            registry::AES_192_CBC => Ok(ContentCipher::Aes192Cbc),
            registry::AES_256_CBC => Ok(ContentCipher::Aes256Cbc),
            _ => Err(Error::UnsupportedCipher),
        }
    }
}

impl fmt::Display for ContentCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Cipher and IV recovered from an EncryptedContentInfo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CipherParams {
    pub cipher: ContentCipher,
    pub iv: Vec<u8>,
    /// RC2 given as a bare IV; the effective key size is the key length.
    pub bits_from_key: bool,
}

impl CipherParams {
    /// Settle the cipher against an unwrapped key, checking its length.
    pub fn for_key(&self, key: &[u8]) -> Result<ContentCipher> {
        if self.bits_from_key {
            return match u16::try_from(key.len() * 8) {
                Ok(effective_bits) if !key.is_empty() && key.len() <= 128 => {
                    Ok(ContentCipher::Rc2Cbc { effective_bits })
                }
                _ => Err(Error::DecryptedKeyWrongLength),
            };
        }
        if key.len() != self.cipher.key_len() {
            return Err(Error::DecryptedKeyWrongLength);
        }
        Ok(self.cipher)
    }
}

/// RFC 2268 parameters as written by OpenSSL.
///
/// ```text
/// RC2-CBCParameter ::= SEQUENCE {
///   rc2ParameterVersion INTEGER,
///   iv OCTET STRING (SIZE(8)) }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct Rc2CbcParameter {
    version: u32,
    iv: OctetString,
}

/// RFC 2268 section 6: rc2ParameterVersion for effective key sizes below 256.
const RC2_VERSIONS: [u8; 256] = [
    0xbd, 0x56, 0xea, 0xf2, 0xa2, 0xf1, 0xac, 0x2a, 0xb0, 0x93, 0xd1, 0x9c, 0x1b, 0x33, 0xfd, 0xd0,
    0x30, 0x04, 0xb6, 0xdc, 0x7d, 0xdf, 0x32, 0x4b, 0xf7, 0xcb, 0x45, 0x9b, 0x31, 0xbb, 0x21, 0x5a,
    0x41, 0x9f, 0xe1, 0xd9, 0x4a, 0x4d, 0x9e, 0xda, 0xa0, 0x68, 0x2c, 0xc3, 0x27, 0x5f, 0x80, 0x36,
    0x3e, 0xee, 0xfb, 0x95, 0x1a, 0xfe, 0xce, 0xa8, 0x34, 0xa9, 0x13, 0xf0, 0xa6, 0x3f, 0xd8, 0x0c,
    0x78, 0x24, 0xaf, 0x23, 0x52, 0xc1, 0x67, 0x17, 0xf5, 0x66, 0x90, 0xe7, 0xe8, 0x07, 0xb8, 0x60,
    0x48, 0xe6, 0x1e, 0x53, 0xf3, 0x92, 0xa4, 0x72, 0x8c, 0x08, 0x15, 0x6e, 0x86, 0x00, 0x84, 0xfa,
    0xf4, 0x7f, 0x8a, 0x42, 0x19, 0xf6, 0xdb, 0xcd, 0x14, 0x8d, 0x50, 0x12, 0xba, 0x3c, 0x06, 0x4e,
    0xec, 0xb3, 0x35, 0x11, 0xa1, 0x88, 0x8e, 0x2b, 0x94, 0x99, 0xb7, 0x71, 0x74, 0xd3, 0xe4, 0xbf,
    0x3a, 0xde, 0x96, 0x0e, 0xbc, 0x0a, 0xed, 0x77, 0xfc, 0x37, 0x6b, 0x03, 0x79, 0x89, 0x62, 0xc6,
    0xd7, 0xc0, 0xd2, 0x7c, 0x6a, 0x8b, 0x22, 0xa3, 0x5b, 0x05, 0x5d, 0x02, 0x75, 0xd5, 0x61, 0xe3,
    0x18, 0x8f, 0x55, 0x51, 0xad, 0x1f, 0x0b, 0x5e, 0x85, 0xe5, 0xc2, 0x57, 0x63, 0xca, 0x3d, 0x6c,
    0xb4, 0xc5, 0xcc, 0x70, 0xb2, 0x91, 0x59, 0x0d, 0x47, 0x20, 0xc8, 0x4f, 0x58, 0xe0, 0x01, 0xe2,
    0x16, 0x38, 0xc4, 0x6f, 0x3b, 0x0f, 0x65, 0x46, 0xbe, 0x7e, 0x2d, 0x7b, 0x82, 0xf9, 0x40, 0xb5,
    0x1d, 0x73, 0xf8, 0xeb, 0x26, 0xc7, 0x87, 0x97, 0x25, 0x54, 0xb1, 0x28, 0xaa, 0x98, 0x9d, 0xa5,
    0x64, 0x6d, 0x7a, 0xd4, 0x10, 0x81, 0x44, 0xef, 0x49, 0xd6, 0xae, 0x2e, 0xdd, 0x76, 0x5c, 0x2f,
    0xa7, 0x1c, 0xc9, 0x09, 0x69, 0x9a, 0x83, 0xcf, 0x29, 0x39, 0xb9, 0xe9, 0x4c, 0xff, 0x43, 0xab,
];

/// Effective key sizes RC2 accepts.
pub(crate) const RC2_EFFECTIVE_BITS: core::ops::RangeInclusive<u16> = 1..=1024;

fn rc2_version(effective_bits: u16) -> u32 {
    match RC2_VERSIONS.get(usize::from(effective_bits)) {
        Some(&version) => u32::from(version),
        None => u32::from(effective_bits),
    }
}

fn rc2_effective_bits(version: u32) -> Result<u16> {
    if version >= 256 {
        return u16::try_from(version)
            .ok()
            .filter(|bits| RC2_EFFECTIVE_BITS.contains(bits))
            .ok_or(Error::UnsupportedCipher);
    }
    match RC2_VERSIONS.iter().position(|&v| u32::from(v) == version) {
        Some(bits) if bits > 0 => Ok(bits as u16),
        _ => Err(Error::UnsupportedCipher),
    }
}

fn set_odd_parity(key: &mut [u8]) {
    for byte in key.iter_mut() {
        let high = *byte & 0xfe;
        *byte = high | ((high.count_ones() + 1) & 1) as u8;
    }
}
