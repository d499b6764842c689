#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! # Content types
//!
//! A [`Pkcs7`] message holds exactly one of the six PKCS#7 content types
//! ([`ContentType`]): Data, SignedData, EnvelopedData,
//! SignedAndEnvelopedData, DigestedData and EncryptedData. Messages parse
//! from and serialise to DER with [`Pkcs7::from_der`] and
//! [`Pkcs7::to_der`]; re-encoding a parsed message reproduces its bytes.
//!
//! # Streaming
//!
//! Payload bytes flow through a [`bio::Bio`] filter chain. For a message
//! being built, [`Pkcs7::data_init`] returns a chain with the digest and
//! cipher stages the content type needs; after the payload has been
//! written, [`Pkcs7::data_final`] stores signatures, digests and ciphertext.
//! For a parsed message, [`Pkcs7::data_decode`] returns a chain that yields
//! the plaintext while accumulating digests for
//! [`Pkcs7::signature_verify`].
//!
//! ```
//! use pkcs7_engine::{ContentType, DigestAlgorithm, Pkcs7};
//!
//! let mut rng = rand::thread_rng(); // rand@0.8
//!
//! let mut p7 = Pkcs7::new(ContentType::Digest);
//! p7.set_digest(DigestAlgorithm::Sha256)?;
//! let mut bio = p7.data_init(&mut rng, None)?;
//! bio.feed(b"hello world")?;
//! p7.data_final(&mut rng, &mut bio)?;
//!
//! let parsed = Pkcs7::from_der(&p7.to_der()?)?;
//! let mut bio = parsed.data_decode(&mut rng, None, None, None)?;
//! assert_eq!(bio.read_all()?, b"hello world");
//! # Ok::<(), pkcs7_engine::Error>(())
//! ```
//!
//! # Workflows
//!
//! [`sign`], [`verify`], [`encrypt`] and [`decrypt`] wrap the engine for
//! the common S/MIME cases and take [`Flags`] with OpenSSL's values.
//! Certificate chains are checked through the [`ChainValidator`] trait;
//! [`TrustStore`] is a small implementation of it.
//!
//! # Keys
//!
//! Signers may use RSA (PKCS#1 v1.5), DSA or ECDSA P-256 keys. Only RSA
//! keys can wrap and unwrap content keys.

#[cfg(doctest)]
pub struct ReadmeDoctests;

pub use der;
pub use rand_core;
pub use x509_cert;

pub mod algorithms;
pub mod attributes;
pub mod bio;
pub mod content;
pub mod errors;
pub mod flags;
pub mod keys;
#[cfg(feature = "pem")]
pub mod pem;
pub mod pkcs7;
pub mod recipient_info;
pub mod registry;
pub mod signer_info;
pub mod smime;
pub mod store;
pub mod text;

mod asn1;

#[cfg(test)]
mod testing;

pub use crate::{
    algorithms::{ContentCipher, DigestAlgorithm},
    asn1::IssuerAndSerialNumber,
    attributes::{Attribute, Attributes},
    content::{Content, ContentType},
    errors::{Error, Result},
    flags::Flags,
    keys::{KeyType, PrivateKey, PublicKey},
    pkcs7::Pkcs7,
    recipient_info::RecipientInfo,
    signer_info::SignerInfo,
    smime::{decrypt, encrypt, finalize, sign, verify},
    store::{ChainError, ChainValidator, Purpose, TrustStore},
};
