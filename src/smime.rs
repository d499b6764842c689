//! Sign, verify, encrypt and decrypt in one call.

use std::io::{self, Write};

use rand_core::CryptoRngCore;
use x509_cert::Certificate;

use crate::algorithms::{ContentCipher, DigestAlgorithm};
use crate::attributes::{Attribute, DEFAULT_SMIME_CAPABILITIES};
use crate::bio::{Bio, Stage};
use crate::content::ContentType;
use crate::errors::{Error, Result};
use crate::flags::Flags;
use crate::keys::PrivateKey;
use crate::pkcs7::Pkcs7;
use crate::registry;
use crate::store::{ChainValidator, Purpose};
use crate::text;

const COPY_CHUNK: usize = 4096;

/// Sign `data` with `key`, digesting with SHA-1.
///
/// Unless [`Flags::NO_CERTS`] is given, `cert` and `certs` are embedded.
/// Unless [`Flags::NO_ATTR`] is given, content-type and (without
/// [`Flags::NO_SMIME_CAP`]) SMIMECapabilities are added as signed
/// attributes. With [`Flags::STREAM`] or [`Flags::PARTIAL`] the message is
/// returned unfinished; pass it to [`finalize`] or drive
/// [`Pkcs7::data_init`] and [`Pkcs7::data_final`] yourself.
///
/// ```no_run
/// # fn example(cert: x509_cert::Certificate, key: pkcs7_engine::PrivateKey) -> pkcs7_engine::Result<()> {
/// use pkcs7_engine::{sign, verify, Flags, TrustStore};
///
/// let mut rng = rand::thread_rng();
/// let p7 = sign(&mut rng, &cert, key, &[], b"hello world", Flags::BINARY)?;
///
/// let mut store = TrustStore::new();
/// store.add_anchor(cert);
/// let mut out = Vec::new();
/// verify(&p7, &[], &store, None, Some(&mut out), Flags::BINARY)?;
/// assert_eq!(out, b"hello world");
/// # Ok(())
/// # }
/// ```
pub fn sign(
    rng: &mut impl CryptoRngCore,
    cert: &Certificate,
    key: PrivateKey,
    certs: &[Certificate],
    data: &[u8],
    flags: Flags,
) -> Result<Pkcs7> {
    let mut p7 = Pkcs7::new(ContentType::Signed);
    p7.content_new(ContentType::Data)?;

    let signer = p7.add_signature(cert, key, DigestAlgorithm::Sha1)?;
    if !flags.contains(Flags::NO_ATTR) {
        signer.add_signed_attribute(Attribute::content_type(registry::PKCS7_DATA)?);
        if !flags.contains(Flags::NO_SMIME_CAP) {
            signer.add_signed_attribute(Attribute::smime_capabilities(&DEFAULT_SMIME_CAPABILITIES)?);
        }
    }

    if !flags.contains(Flags::NO_CERTS) {
        p7.add_certificate(cert.clone())?;
        for extra in certs {
            p7.add_certificate(extra.clone())?;
        }
    }

    if flags.contains(Flags::DETACHED) {
        p7.set_detached(true)?;
    }
    if flags.intersects(Flags::STREAM | Flags::PARTIAL) {
        return Ok(p7);
    }
    finalize(rng, &mut p7, data, flags)?;
    Ok(p7)
}

/// Stream `data` through a fresh chain and seal the message.
pub fn finalize(rng: &mut impl CryptoRngCore, p7: &mut Pkcs7, data: &[u8], flags: Flags) -> Result<()> {
    let mut bio = p7.data_init(rng, None)?;
    text::crlf_copy(data, &mut bio, flags)?;
    p7.data_final(rng, &mut bio)
}

/// Verify a SignedData message.
///
/// Signer certificates are looked up in `certs` and then in the message
/// (unless [`Flags::NO_INTERN`]). Each is validated with `store` unless
/// [`Flags::NO_VERIFY`]; the message's certificates serve as untrusted
/// intermediates unless [`Flags::NO_CHAIN`], and its CRLs are used unless
/// [`Flags::NO_CRL`]. The content (`indata` for a detached signature) is
/// written to `out` before the signatures are checked, so a failed
/// verification may leave untrusted bytes in `out`.
pub fn verify(
    p7: &Pkcs7,
    certs: &[Certificate],
    store: &impl ChainValidator,
    indata: Option<&[u8]>,
    out: Option<&mut dyn Write>,
    flags: Flags,
) -> Result<()> {
    if p7.content_type() != ContentType::Signed {
        return Err(Error::WrongContentType);
    }
    if p7.is_detached() && indata.is_none() {
        return Err(Error::NoContent);
    }
    let signer_infos = p7.signer_infos();
    if signer_infos.is_empty() {
        return Err(Error::NoSignatures);
    }
    let signers = p7.signers(certs, flags)?;

    if !flags.contains(Flags::NO_VERIFY) {
        let untrusted = if flags.contains(Flags::NO_CHAIN) {
            &[][..]
        } else {
            p7.certificates()
        };
        let crls = if flags.contains(Flags::NO_CRL) {
            &[][..]
        } else {
            p7.crls()
        };
        for signer in &signers {
            store
                .validate(signer, untrusted, crls, Purpose::SmimeSign)
                .map_err(|err| {
                    tracing::debug!(error = %err, "signer certificate rejected");
                    Error::CertificateVerify(format!("Verify error:{err}"))
                })?;
        }
    }

    let mut bio = p7.decode_plain(indata.map(|data| Bio::new(Stage::mem_with(data))))?;
    if flags.contains(Flags::TEXT) {
        let content = bio.read_all()?;
        match out {
            Some(out) => text::strip_text_header(&content, out)?,
            None => text::strip_text_header(&content, &mut io::sink())?,
        }
    } else {
        copy(&mut bio, out)?;
    }

    if !flags.contains(Flags::NO_SIGS) {
        for (index, (signer_info, cert)) in signer_infos.iter().zip(&signers).enumerate() {
            p7.signature_verify(&bio, signer_info, cert)?;
            tracing::debug!(signer = index, "signature verified");
        }
    }
    Ok(())
}

/// Encrypt `data` for every certificate in `certs`.
pub fn encrypt(
    rng: &mut impl CryptoRngCore,
    certs: &[Certificate],
    data: &[u8],
    cipher: ContentCipher,
    flags: Flags,
) -> Result<Pkcs7> {
    let mut p7 = Pkcs7::new(ContentType::Enveloped);
    p7.set_cipher(cipher)?;
    for cert in certs {
        p7.add_recipient(cert)?;
    }

    if flags.intersects(Flags::STREAM | Flags::PARTIAL) {
        return Ok(p7);
    }
    finalize(rng, &mut p7, data, flags)?;
    Ok(p7)
}

/// Decrypt an EnvelopedData message into `out`.
///
/// With `cert`, the key must belong to it and only its recipient entry is
/// used; without, every recipient is tried.
pub fn decrypt(
    rng: &mut impl CryptoRngCore,
    p7: &Pkcs7,
    key: &PrivateKey,
    cert: Option<&Certificate>,
    out: &mut dyn Write,
    flags: Flags,
) -> Result<()> {
    if p7.content_type() != ContentType::Enveloped {
        return Err(Error::WrongContentType);
    }
    if let Some(cert) = cert {
        if !key.matches_certificate(cert) {
            return Err(Error::PrivateKeyDoesNotMatchCertificate);
        }
    }

    let mut bio = p7.data_decode(rng, Some(key), None, cert)?;
    if flags.contains(Flags::TEXT) {
        let content = bio.read_all()?;
        text::strip_text_header(&content, out)
    } else {
        copy(&mut bio, Some(out))
    }
}

fn copy(bio: &mut Bio, mut out: Option<&mut dyn Write>) -> Result<()> {
    let mut buf = [0u8; COPY_CHUNK];
    loop {
        let n = bio.pull(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        if let Some(out) = out.as_deref_mut() {
            out.write_all(&buf[..n])?;
        }
    }
}
