//! Error types.

use crate::bio::StageKind;

/// Alias for [`core::result::Result`] with the `pkcs7-engine` [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed DER: bad tag, bad length or an unknown content type OID.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// Malformed PEM armour around a message.
    #[error("invalid PEM encoding")]
    Pem,

    /// Content type OID outside the six PKCS#7 types.
    #[error("unsupported content type")]
    UnsupportedContentType,

    /// Content cipher OID or RC2 key size the engine cannot use.
    #[error("unsupported cipher")]
    UnsupportedCipher,

    /// Digest OID the engine cannot compute.
    #[error("unsupported digest")]
    UnsupportedDigest,

    /// Public key or signature algorithm the engine cannot use.
    #[error("unsupported public key algorithm")]
    UnsupportedAlgorithm,

    /// `data_init` or `data_decode` on a content type without a data stream.
    #[error("operation not supported on this content type")]
    UnsupportedOperation,

    /// Operation not defined for the message's content type.
    #[error("wrong content type")]
    WrongContentType,

    /// Detached signature with no external content supplied.
    #[error("no content")]
    NoContent,

    /// A signer has no signature and no key to make one.
    #[error("no signatures on data")]
    NoSignatures,

    /// SignedData without any SignerInfo.
    #[error("no signers")]
    NoSigners,

    /// A SignerInfo names no supplied or embedded certificate.
    #[error("signer certificate not found")]
    SignerCertificateNotFound,

    /// No RecipientInfo names the decrypting certificate.
    #[error("no recipient matches certificate")]
    NoRecipientMatchesCertificate,

    /// No RecipientInfo unwraps with the private key.
    #[error("no recipient matches key")]
    NoRecipientMatchesKey,

    /// Unwrapped content key has the wrong size for the cipher.
    #[error("decrypted key is wrong length")]
    DecryptedKeyWrongLength,

    /// Key unwrap or content decryption failed.
    #[error("decrypt error")]
    Decrypt,

    /// Signer key and certificate do not pair.
    #[error("private key does not match certificate")]
    PrivateKeyDoesNotMatchCertificate,

    /// The private key could not produce a signature over the digest.
    #[error("signing failed")]
    Sign,

    /// Signature or message digest did not verify.
    #[error("signature failure")]
    NotVerified,

    /// Chain validation failed; carries the validator's diagnostic.
    #[error("certificate verify error: {0}")]
    CertificateVerify(String),

    /// Enveloped message built without a content cipher.
    #[error("cipher not initialized")]
    CipherNotInitialized,

    /// Content key could not be set up or wrapped.
    #[error("error setting cipher")]
    ErrorSettingCipher,

    /// A stage the engine pushed is missing from the chain.
    #[error("filter chain is missing a {0:?} stage")]
    PipelineIntegrity(StageKind),

    /// Text mode input without a `text/plain` header.
    #[error("invalid mime type")]
    InvalidMimeType,

    /// Failure from an external reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<spki::Error> for Error {
    fn from(err: spki::Error) -> Error {
        match err {
            spki::Error::Asn1(err) => Error::Asn1(err),
            _ => Error::UnsupportedAlgorithm,
        }
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Error {
        match err {
            pkcs8::Error::Asn1(err) => Error::Asn1(err),
            _ => Error::UnsupportedAlgorithm,
        }
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Error {
        match err {
            rsa::Error::Decryption => Error::Decrypt,
            rsa::Error::Verification => Error::NotVerified,
            _ => Error::UnsupportedAlgorithm,
        }
    }
}

impl From<signature::Error> for Error {
    fn from(_: signature::Error) -> Error {
        Error::NotVerified
    }
}

#[cfg(feature = "pem")]
impl From<pem_rfc7468::Error> for Error {
    fn from(_: pem_rfc7468::Error) -> Error {
        Error::Pem
    }
}

impl From<pkcs1::Error> for Error {
    fn from(err: pkcs1::Error) -> Error {
        match err {
            pkcs1::Error::Asn1(err) => Error::Asn1(err),
            _ => Error::UnsupportedAlgorithm,
        }
    }
}

impl From<base64ct::Error> for Error {
    fn from(_: base64ct::Error) -> Error {
        Error::Pem
    }
}
