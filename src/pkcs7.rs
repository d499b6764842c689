//! The PKCS#7 message object and its streaming engine.
//!
//! A [`Pkcs7`] is assembled in three steps: [`Pkcs7::data_init`] builds a
//! filter chain for the content type, the caller writes the payload into
//! the chain, and [`Pkcs7::data_final`] collects digests, signatures and
//! ciphertext back into the message. [`Pkcs7::data_decode`] builds the
//! reading chain for a parsed message.

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use x509_cert::crl::CertificateList;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::algorithms::{CipherParams, ContentCipher, DigestAlgorithm, RC2_EFFECTIVE_BITS};
use crate::bio::{Bio, Direction, Stage, StageKind};
use crate::content::{Content, ContentType, EncryptedContentInfo};
use crate::errors::{Error, Result};
use crate::flags::Flags;
use crate::keys::PrivateKey;
use crate::recipient_info::RecipientInfo;
use crate::signer_info::SignerInfo;

/// A PKCS#7 `ContentInfo` together with its processing state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pkcs7 {
    content: Content,
    detached: bool,
}

impl Pkcs7 {
    /// Empty message of `content_type`.
    pub fn new(content_type: ContentType) -> Self {
        Pkcs7 {
            content: Content::new(content_type),
            detached: false,
        }
    }

    /// Replace the payload with a fresh instance of `content_type`.
    pub fn set_type(&mut self, content_type: ContentType) {
        self.content = Content::new(content_type);
        self.detached = false;
    }

    /// [`Pkcs7::set_type`] by OID. Unknown OIDs give [`Error::UnsupportedContentType`].
    pub fn set_type_oid(&mut self, oid: &ObjectIdentifier) -> Result<()> {
        self.set_type(ContentType::from_oid(oid)?);
        Ok(())
    }

    /// Type of the outer payload.
    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }

    /// Outer payload.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Outer payload, mutably.
    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    /// Take the outer payload.
    pub fn into_content(self) -> Content {
        self.content
    }

    /// Parse a DER `ContentInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let content = Content::from_der(der)?;
        let detached = match &content {
            Content::Signed(signed) => matches!(*signed.content, Content::Data(None)),
            _ => false,
        };
        Ok(Pkcs7 { content, detached })
    }

    /// Serialise as a DER `ContentInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.content.to_der()?)
    }

    /// Parse a `PKCS7` PEM document.
    #[cfg(feature = "pem")]
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, der) = crate::pem::decode(pem)?;
        match label.as_str() {
            "PKCS7" | "PKCS #7 SIGNED DATA" => Self::from_der(&der),
            _ => Err(Error::Pem),
        }
    }

    /// Serialise as a `PKCS7` PEM document.
    #[cfg(feature = "pem")]
    pub fn to_pem(&self) -> Result<String> {
        crate::pem::encode("PKCS7", &self.to_der()?)
    }

    /// Whether signed content is carried outside the message.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Omit the signed content from the encoding. SignedData only.
    pub fn set_detached(&mut self, detached: bool) -> Result<()> {
        match &mut self.content {
            Content::Signed(signed) => {
                if detached {
                    if let Content::Data(data) = signed.content.as_mut() {
                        *data = None;
                    }
                }
                self.detached = detached;
                Ok(())
            }
            _ => Err(Error::UnsupportedOperation),
        }
    }

    /// Select the content-encryption cipher of an enveloped message.
    pub fn set_cipher(&mut self, cipher: ContentCipher) -> Result<()> {
        if let ContentCipher::Rc2Cbc { effective_bits } = cipher {
            if !RC2_EFFECTIVE_BITS.contains(&effective_bits) {
                return Err(Error::UnsupportedCipher);
            }
        }
        self.encrypted_content_info_mut()
            .ok_or(Error::WrongContentType)?
            .set_cipher(cipher);
        Ok(())
    }

    /// Select the digest of a DigestedData message.
    pub fn set_digest(&mut self, algorithm: DigestAlgorithm) -> Result<()> {
        match &mut self.content {
            Content::Digest(digest) => {
                digest.digest_algorithm = algorithm.algorithm_identifier();
                Ok(())
            }
            _ => Err(Error::WrongContentType),
        }
    }

    /// Attach a signer, adding its digest algorithm to the message's
    /// digest algorithm set when missing.
    pub fn add_signer(&mut self, signer: SignerInfo) -> Result<&mut SignerInfo> {
        let (digest_algorithms, signer_infos) = self.signer_parts_mut().ok_or(Error::WrongContentType)?;
        let algorithm = signer.digest_algorithm_identifier();
        if !digest_algorithms.iter().any(|a| a.oid == algorithm.oid) {
            digest_algorithms.push(algorithm.clone());
        }
        signer_infos.push(signer);
        signer_infos.last_mut().ok_or(Error::NoSigners)
    }

    /// Build a [`SignerInfo`] for `cert` and `key` and attach it.
    pub fn add_signature(
        &mut self,
        cert: &Certificate,
        key: PrivateKey,
        digest: DigestAlgorithm,
    ) -> Result<&mut SignerInfo> {
        let signer = SignerInfo::new(cert, key, digest)?;
        self.add_signer(signer)
    }

    /// Add a recipient for `cert`.
    pub fn add_recipient(&mut self, cert: &Certificate) -> Result<&mut RecipientInfo> {
        let recipient = RecipientInfo::new(cert)?;
        self.add_recipient_info(recipient)
    }

    /// Append a prepared RecipientInfo.
    pub fn add_recipient_info(&mut self, recipient: RecipientInfo) -> Result<&mut RecipientInfo> {
        let recipients = match &mut self.content {
            Content::Enveloped(enveloped) => &mut enveloped.recipient_infos,
            Content::SignedAndEnveloped(sne) => &mut sne.recipient_infos,
            _ => return Err(Error::WrongContentType),
        };
        recipients.push(recipient);
        recipients.last_mut().ok_or(Error::NoRecipientMatchesCertificate)
    }

    /// Embed `cert` in a SignedData or SignedAndEnvelopedData.
    pub fn add_certificate(&mut self, cert: Certificate) -> Result<()> {
        let certificates = match &mut self.content {
            Content::Signed(signed) => &mut signed.certificates,
            Content::SignedAndEnveloped(sne) => &mut sne.certificates,
            _ => return Err(Error::WrongContentType),
        };
        certificates.get_or_insert_with(Vec::new).push(cert);
        Ok(())
    }

    /// Embed `crl` in a SignedData or SignedAndEnvelopedData.
    pub fn add_crl(&mut self, crl: CertificateList) -> Result<()> {
        let crls = match &mut self.content {
            Content::Signed(signed) => &mut signed.crls,
            Content::SignedAndEnveloped(sne) => &mut sne.crls,
            _ => return Err(Error::WrongContentType),
        };
        crls.get_or_insert_with(Vec::new).push(crl);
        Ok(())
    }

    /// Nest `inner` as the payload of a SignedData or DigestedData.
    pub fn set_content(&mut self, inner: Pkcs7) -> Result<()> {
        let slot = match &mut self.content {
            Content::Signed(signed) => &mut signed.content,
            Content::Digest(digest) => &mut digest.content,
            _ => return Err(Error::WrongContentType),
        };
        **slot = inner.content;
        Ok(())
    }

    /// Nest a fresh, empty payload of `content_type`.
    pub fn content_new(&mut self, content_type: ContentType) -> Result<()> {
        self.set_content(Pkcs7::new(content_type))
    }

    /// SignerInfos; empty for types without signers.
    pub fn signer_infos(&self) -> &[SignerInfo] {
        match &self.content {
            Content::Signed(signed) => &signed.signer_infos,
            Content::SignedAndEnveloped(sne) => &sne.signer_infos,
            _ => &[],
        }
    }

    /// SignerInfos, mutably.
    pub fn signer_infos_mut(&mut self) -> &mut [SignerInfo] {
        match self.signer_parts_mut() {
            Some((_, signer_infos)) => signer_infos.as_mut_slice(),
            None => Default::default(),
        }
    }

    /// RecipientInfos; empty for types without recipients.
    pub fn recipient_infos(&self) -> &[RecipientInfo] {
        match &self.content {
            Content::Enveloped(enveloped) => &enveloped.recipient_infos,
            Content::SignedAndEnveloped(sne) => &sne.recipient_infos,
            _ => &[],
        }
    }

    /// Embedded certificates.
    pub fn certificates(&self) -> &[Certificate] {
        match &self.content {
            Content::Signed(signed) => signed.certificates(),
            Content::SignedAndEnveloped(sne) => sne.certificates(),
            _ => &[],
        }
    }

    /// Embedded revocation lists.
    pub fn crls(&self) -> &[CertificateList] {
        match &self.content {
            Content::Signed(signed) => signed.crls(),
            Content::SignedAndEnveloped(sne) => sne.crls(),
            _ => &[],
        }
    }

    /// Octets of a Data message.
    pub fn data(&self) -> Option<&[u8]> {
        self.content.data()
    }

    /// Embedded payload of a SignedData whose content is Data.
    pub fn signed_content(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Signed(signed) => signed.content.data(),
            _ => None,
        }
    }

    /// Resolve every SignerInfo to its certificate, looking in `certs` first
    /// and then, unless [`Flags::NO_INTERN`] is set, in the message itself.
    pub fn signers<'a>(&'a self, certs: &'a [Certificate], flags: Flags) -> Result<Vec<&'a Certificate>> {
        if !matches!(self.content_type(), ContentType::Signed | ContentType::SignedAndEnveloped) {
            return Err(Error::WrongContentType);
        }
        let signer_infos = self.signer_infos();
        if signer_infos.is_empty() {
            return Err(Error::NoSigners);
        }

        let embedded = if flags.contains(Flags::NO_INTERN) {
            &[][..]
        } else {
            self.certificates()
        };
        signer_infos
            .iter()
            .map(|si| {
                certs
                    .iter()
                    .chain(embedded)
                    .find(|cert| si.matches(cert))
                    .ok_or(Error::SignerCertificateNotFound)
            })
            .collect()
    }

    /// Build the writing chain for this message.
    ///
    /// Without `sink`, content is collected in a memory buffer (a null sink
    /// for detached signatures). Enveloped messages get a fresh content key,
    /// wrapped here for every recipient.
    pub fn data_init(&mut self, rng: &mut impl CryptoRngCore, sink: Option<Bio>) -> Result<Bio> {
        let detached = self.detached;
        let mut bio = sink.unwrap_or_else(|| {
            if detached {
                Bio::new(Stage::Null)
            } else {
                Bio::new(Stage::mem())
            }
        });

        match &mut self.content {
            Content::Signed(signed) => {
                push_digests(&mut bio, &signed.digest_algorithms)?;
            }
            Content::Enveloped(enveloped) => {
                let stage = seal(
                    rng,
                    &mut enveloped.recipient_infos,
                    &mut enveloped.encrypted_content_info,
                )?;
                bio.push(stage);
            }
            Content::SignedAndEnveloped(sne) => {
                let stage = seal(rng, &mut sne.recipient_infos, &mut sne.encrypted_content_info)?;
                bio.push(stage);
                push_digests(&mut bio, &sne.digest_algorithms)?;
            }
            Content::Digest(digest) => {
                let algorithm = DigestAlgorithm::from_algorithm_identifier(&digest.digest_algorithm)?;
                bio.push(Stage::digest(algorithm));
            }
            Content::Data(_) | Content::Encrypted(_) => return Err(Error::UnsupportedOperation),
        }

        tracing::debug!(content_type = %self.content_type(), stages = ?bio.kinds(), "write chain assembled");
        Ok(bio)
    }

    /// Flush `bio` and store what it computed: signatures for every signer
    /// still holding a key, the captured content or ciphertext, and the
    /// digest of a DigestedData.
    pub fn data_final(&mut self, rng: &mut impl CryptoRngCore, bio: &mut Bio) -> Result<()> {
        bio.finish()?;
        let detached = self.detached;

        match &mut self.content {
            Content::Signed(signed) => {
                sign_all(rng, bio, &mut signed.signer_infos)?;
                if let Content::Data(data) = signed.content.as_mut() {
                    *data = if detached { None } else { Some(captured(bio)?) };
                }
            }
            Content::SignedAndEnveloped(sne) => {
                sign_all(rng, bio, &mut sne.signer_infos)?;
                sne.encrypted_content_info.encrypted_content = Some(captured(bio)?);
            }
            Content::Enveloped(enveloped) => {
                enveloped.encrypted_content_info.encrypted_content = Some(captured(bio)?);
            }
            Content::Digest(digest) => {
                let algorithm = DigestAlgorithm::from_algorithm_identifier(&digest.digest_algorithm)?;
                let md = bio
                    .digest(algorithm)
                    .ok_or(Error::PipelineIntegrity(StageKind::Digest))?;
                digest.digest = md.current();
                if let Content::Data(data) = digest.content.as_mut() {
                    *data = Some(captured(bio)?);
                }
            }
            Content::Data(_) | Content::Encrypted(_) => return Err(Error::UnsupportedOperation),
        }
        Ok(())
    }

    /// Build the reading chain for this message.
    ///
    /// `input` supplies the content of a detached signature; otherwise the
    /// embedded content is read. Enveloped content needs `key`: with `cert`
    /// only the matching recipient is unwrapped, without it every recipient
    /// is tried in order and the first key that unwraps is used.
    pub fn data_decode(
        &self,
        rng: &mut impl CryptoRngCore,
        key: Option<&PrivateKey>,
        input: Option<Bio>,
        cert: Option<&Certificate>,
    ) -> Result<Bio> {
        match &self.content {
            Content::Signed(_) | Content::Digest(_) => self.decode_plain(input),
            Content::Enveloped(enveloped) => decode_sealed(
                rng,
                key,
                input,
                cert,
                &enveloped.recipient_infos,
                &enveloped.encrypted_content_info,
                &[],
            ),
            Content::SignedAndEnveloped(sne) => decode_sealed(
                rng,
                key,
                input,
                cert,
                &sne.recipient_infos,
                &sne.encrypted_content_info,
                &sne.digest_algorithms,
            ),
            Content::Data(_) | Content::Encrypted(_) => Err(Error::UnsupportedOperation),
        }
    }

    /// Reading chain for content that is not encrypted.
    pub(crate) fn decode_plain(&self, input: Option<Bio>) -> Result<Bio> {
        let (digest_algorithms, inner) = match &self.content {
            Content::Signed(signed) => (signed.digest_algorithms.clone(), &signed.content),
            Content::Digest(digest) => (vec![digest.digest_algorithm.clone()], &digest.content),
            _ => return Err(Error::UnsupportedOperation),
        };
        let body = match &**inner {
            Content::Data(data) => data.as_deref(),
            _ => return Err(Error::UnsupportedContentType),
        };

        let mut bio = source(input, body)?;
        push_digests(&mut bio, &digest_algorithms)?;
        tracing::debug!(stages = ?bio.kinds(), "read chain assembled");
        Ok(bio)
    }

    /// Check one signer against the digest accumulated in `bio`.
    pub fn signature_verify(&self, bio: &Bio, signer: &SignerInfo, cert: &Certificate) -> Result<()> {
        if !matches!(self.content_type(), ContentType::Signed | ContentType::SignedAndEnveloped) {
            return Err(Error::WrongContentType);
        }
        let algorithm = signer.digest_algorithm()?;
        let md = bio
            .digest(algorithm)
            .ok_or(Error::PipelineIntegrity(StageKind::Digest))?;
        let public = crate::keys::PublicKey::from_certificate(cert)?;
        signer.verify(&public, &md.current())
    }

    fn signer_parts_mut(&mut self) -> Option<(&mut Vec<AlgorithmIdentifierOwned>, &mut Vec<SignerInfo>)> {
        match &mut self.content {
            Content::Signed(signed) => Some((&mut signed.digest_algorithms, &mut signed.signer_infos)),
            Content::SignedAndEnveloped(sne) => Some((&mut sne.digest_algorithms, &mut sne.signer_infos)),
            _ => None,
        }
    }

    fn encrypted_content_info_mut(&mut self) -> Option<&mut EncryptedContentInfo> {
        match &mut self.content {
            Content::Enveloped(enveloped) => Some(&mut enveloped.encrypted_content_info),
            Content::SignedAndEnveloped(sne) => Some(&mut sne.encrypted_content_info),
            _ => None,
        }
    }
}

impl From<Content> for Pkcs7 {
    fn from(content: Content) -> Self {
        Pkcs7 {
            content,
            detached: false,
        }
    }
}

/// Push one digest stage per algorithm, keeping the set's order from the head.
fn push_digests(bio: &mut Bio, algorithms: &[AlgorithmIdentifierOwned]) -> Result<()> {
    for alg in algorithms.iter().rev() {
        bio.push(Stage::digest(DigestAlgorithm::from_algorithm_identifier(alg)?));
    }
    Ok(())
}

/// Generate the content key and IV, wrap the key for every recipient and
/// return the encrypting stage.
fn seal(
    rng: &mut impl CryptoRngCore,
    recipients: &mut [RecipientInfo],
    info: &mut EncryptedContentInfo,
) -> Result<Stage> {
    let cipher = info.cipher.ok_or(Error::CipherNotInitialized)?;
    let key = cipher.generate_key(rng);
    let iv = cipher.generate_iv(rng);
    info.algorithm = cipher.algorithm_identifier(&iv)?;

    for recipient in recipients.iter_mut() {
        recipient.wrap(rng, &key)?;
    }
    Stage::cipher(cipher, &key, &iv, Direction::Encrypt)
}

fn sign_all(rng: &mut impl CryptoRngCore, bio: &Bio, signers: &mut [SignerInfo]) -> Result<()> {
    for signer in signers.iter_mut().filter(|si| si.has_key()) {
        let algorithm = signer.digest_algorithm()?;
        let md = bio
            .digest(algorithm)
            .ok_or(Error::PipelineIntegrity(StageKind::Digest))?;
        signer.sign(rng, &md.current())?;
    }
    Ok(())
}

fn captured(bio: &Bio) -> Result<Vec<u8>> {
    let mem = bio.mem().ok_or(Error::PipelineIntegrity(StageKind::Mem))?;
    Ok(mem.as_bytes().to_vec())
}

/// Caller-supplied input wins over embedded content.
fn source(input: Option<Bio>, embedded: Option<&[u8]>) -> Result<Bio> {
    match (input, embedded) {
        (Some(bio), _) => Ok(bio),
        (None, Some(body)) => Ok(Bio::new(Stage::mem_with(body))),
        (None, None) => Err(Error::NoContent),
    }
}

fn decode_sealed(
    rng: &mut impl CryptoRngCore,
    key: Option<&PrivateKey>,
    input: Option<Bio>,
    cert: Option<&Certificate>,
    recipients: &[RecipientInfo],
    info: &EncryptedContentInfo,
    digest_algorithms: &[AlgorithmIdentifierOwned],
) -> Result<Bio> {
    let params = ContentCipher::from_algorithm_identifier(&info.algorithm)?;
    let mut bio = source(input, info.encrypted_content.as_deref())?;
    let key = key.ok_or(Error::NoRecipientMatchesKey)?;

    let (content_key, cipher) = match cert {
        Some(cert) => {
            let recipient = recipients
                .iter()
                .find(|ri| ri.matches(cert))
                .ok_or(Error::NoRecipientMatchesCertificate)?;
            let content_key = key.unwrap_key(rng, recipient.encrypted_key())?;
            let cipher = params.for_key(&content_key)?;
            (content_key, cipher)
        }
        None => trial_unwrap(rng, key, recipients, &params)?,
    };

    bio.push(Stage::cipher(cipher, &content_key, &params.iv, Direction::Decrypt)?);
    push_digests(&mut bio, digest_algorithms)?;
    tracing::debug!(cipher = %cipher, stages = ?bio.kinds(), "read chain assembled");
    Ok(bio)
}

/// Try `key` against every recipient in order; the first unwrap yielding a
/// key of usable length wins. Not constant time.
fn trial_unwrap(
    rng: &mut impl CryptoRngCore,
    key: &PrivateKey,
    recipients: &[RecipientInfo],
    params: &CipherParams,
) -> Result<(Zeroizing<Vec<u8>>, ContentCipher)> {
    for (index, recipient) in recipients.iter().enumerate() {
        let content_key = match key.unwrap_key(rng, recipient.encrypted_key()) {
            Ok(content_key) => content_key,
            Err(_) => {
                tracing::debug!(recipient = index, "key does not unwrap recipient, skipping");
                continue;
            }
        };
        match params.for_key(&content_key) {
            Ok(cipher) => return Ok((content_key, cipher)),
            Err(_) => tracing::debug!(recipient = index, "unwrapped key has wrong length, skipping"),
        }
    }
    Err(Error::NoRecipientMatchesKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;
    use crate::registry;
    use crate::testing::{identity, rng};

    fn signed_message(flags_detached: bool, with_attributes: bool) -> (Pkcs7, Vec<u8>) {
        let mut rng = rng();
        let alice = identity(0);
        let mut p7 = Pkcs7::new(ContentType::Signed);
        p7.content_new(ContentType::Data).unwrap();
        let si = p7
            .add_signature(&alice.cert, alice.private_key(), DigestAlgorithm::Sha256)
            .unwrap();
        if with_attributes {
            si.add_signed_attribute(Attribute::content_type(registry::PKCS7_DATA).unwrap());
        }
        p7.add_certificate(alice.cert.clone()).unwrap();
        p7.set_detached(flags_detached).unwrap();

        let payload = b"streamed through the chain".to_vec();
        let mut bio = p7.data_init(&mut rng, None).unwrap();
        bio.feed(&payload[..10]).unwrap();
        bio.feed(&payload[10..]).unwrap();
        p7.data_final(&mut rng, &mut bio).unwrap();
        (p7, payload)
    }

    #[test]
    fn set_type_resets_payload() {
        let mut p7 = Pkcs7::new(ContentType::Signed);
        p7.add_certificate(identity(0).cert.clone()).unwrap();
        p7.set_type(ContentType::Signed);
        assert!(p7.certificates().is_empty());

        p7.set_type_oid(&registry::PKCS7_ENVELOPED).unwrap();
        assert_eq!(p7.content_type(), ContentType::Enveloped);
        assert!(matches!(
            p7.set_type_oid(&registry::SHA256),
            Err(Error::UnsupportedContentType)
        ));
    }

    #[test]
    fn operations_check_content_type() {
        let mut enveloped = Pkcs7::new(ContentType::Enveloped);
        assert!(matches!(enveloped.set_detached(true), Err(Error::UnsupportedOperation)));
        assert!(matches!(
            enveloped.add_certificate(identity(0).cert.clone()),
            Err(Error::WrongContentType)
        ));

        let mut signed = Pkcs7::new(ContentType::Signed);
        assert!(matches!(
            signed.set_cipher(ContentCipher::Aes128Cbc),
            Err(Error::WrongContentType)
        ));
        assert!(matches!(
            signed.add_recipient(&identity(0).cert),
            Err(Error::WrongContentType)
        ));

        let mut rng = rng();
        for kind in [ContentType::Data, ContentType::Encrypted] {
            assert!(matches!(
                Pkcs7::new(kind).data_init(&mut rng, None),
                Err(Error::UnsupportedOperation)
            ));
        }
    }

    #[test]
    fn enveloped_init_requires_cipher() {
        let mut rng = rng();
        let mut p7 = Pkcs7::new(ContentType::Enveloped);
        p7.add_recipient(&identity(0).cert).unwrap();
        assert!(matches!(
            p7.data_init(&mut rng, None),
            Err(Error::CipherNotInitialized)
        ));
    }

    #[test]
    fn signer_digest_joins_algorithm_set_once() {
        let alice = identity(0);
        let bob = identity(1);
        let mut p7 = Pkcs7::new(ContentType::Signed);
        p7.add_signature(&alice.cert, alice.private_key(), DigestAlgorithm::Sha256)
            .unwrap();
        p7.add_signature(&bob.cert, bob.private_key(), DigestAlgorithm::Sha256)
            .unwrap();
        p7.add_signature(&bob.cert, bob.private_key(), DigestAlgorithm::Sha1)
            .unwrap();

        let Content::Signed(signed) = p7.content() else {
            panic!("not signed");
        };
        let oids: Vec<_> = signed.digest_algorithms().iter().map(|a| a.oid).collect();
        assert_eq!(oids, [registry::SHA256, registry::SHA1]);
        assert_eq!(p7.signer_infos().len(), 3);
    }

    #[test]
    fn signed_finalise_and_verify() {
        for with_attributes in [true, false] {
            let (p7, payload) = signed_message(false, with_attributes);
            assert_eq!(p7.signed_content(), Some(&payload[..]));
            let si = &p7.signer_infos()[0];
            assert!(!si.has_key());
            assert_eq!(si.signed_attributes().is_some(), with_attributes);

            let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
            assert!(!parsed.is_detached());
            let mut bio = parsed.decode_plain(None).unwrap();
            assert_eq!(bio.read_all().unwrap(), payload);
            parsed
                .signature_verify(&bio, &parsed.signer_infos()[0], &identity(0).cert)
                .unwrap();
            assert!(matches!(
                parsed.signature_verify(&bio, &parsed.signer_infos()[0], &identity(1).cert),
                Err(Error::NotVerified)
            ));
        }
    }

    #[test]
    fn signed_attributes_are_completed_and_sorted() {
        let (p7, payload) = signed_message(false, true);
        let si = &p7.signer_infos()[0];
        assert_eq!(
            si.message_digest().unwrap(),
            DigestAlgorithm::Sha256.digest(&payload)
        );
        assert!(si.signing_time().is_some());

        let attrs = si.signed_attributes().unwrap();
        let in_order: Vec<Vec<u8>> = attrs.iter().map(|a| a.to_der().unwrap()).collect();
        let mut sorted = in_order.clone();
        sorted.sort();
        assert_eq!(in_order, sorted);
    }

    #[test]
    fn detached_content_needs_input() {
        let (p7, payload) = signed_message(true, true);
        assert_eq!(p7.signed_content(), None);

        let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
        assert!(parsed.is_detached());
        assert!(matches!(parsed.decode_plain(None), Err(Error::NoContent)));

        let mut bio = parsed
            .decode_plain(Some(Bio::new(Stage::mem_with(payload.clone()))))
            .unwrap();
        assert_eq!(bio.read_all().unwrap(), payload);
        parsed
            .signature_verify(&bio, &parsed.signer_infos()[0], &identity(0).cert)
            .unwrap();
    }

    #[test]
    fn final_without_digest_stage_is_pipeline_error() {
        let mut rng = rng();
        let alice = identity(0);
        let mut p7 = Pkcs7::new(ContentType::Signed);
        p7.add_signature(&alice.cert, alice.private_key(), DigestAlgorithm::Sha1)
            .unwrap();
        let mut bare = Bio::new(Stage::mem());
        assert!(matches!(
            p7.data_final(&mut rng, &mut bare),
            Err(Error::PipelineIntegrity(StageKind::Digest))
        ));
    }

    #[test]
    fn signers_lookup() {
        let (p7, _) = signed_message(false, false);
        let alice = identity(0);
        let bob = identity(1);

        let found = p7.signers(&[], Flags::empty()).unwrap();
        assert_eq!(found, [&alice.cert]);
        assert!(matches!(
            p7.signers(&[], Flags::NO_INTERN),
            Err(Error::SignerCertificateNotFound)
        ));
        let supplied = [bob.cert.clone(), alice.cert.clone()];
        assert_eq!(p7.signers(&supplied, Flags::NO_INTERN).unwrap(), [&supplied[1]]);

        let empty = Pkcs7::new(ContentType::Signed);
        assert!(matches!(empty.signers(&[], Flags::empty()), Err(Error::NoSigners)));
    }

    #[test]
    fn digested_data() {
        let mut rng = rng();
        let mut p7 = Pkcs7::new(ContentType::Digest);
        p7.set_digest(DigestAlgorithm::Sha384).unwrap();
        let mut bio = p7.data_init(&mut rng, None).unwrap();
        bio.feed(b"abc").unwrap();
        p7.data_final(&mut rng, &mut bio).unwrap();

        let Content::Digest(digest) = p7.content() else {
            panic!("not digested");
        };
        assert_eq!(digest.digest(), DigestAlgorithm::Sha384.digest(b"abc"));
        assert_eq!(digest.content().data(), Some(&b"abc"[..]));

        let der = p7.to_der().unwrap();
        let parsed = Pkcs7::from_der(&der).unwrap();
        assert_eq!(parsed.to_der().unwrap(), der);
        let mut bio = parsed.data_decode(&mut rng, None, None, None).unwrap();
        assert_eq!(bio.read_all().unwrap(), b"abc");
        assert_eq!(
            bio.digest(DigestAlgorithm::Sha384).unwrap().current(),
            DigestAlgorithm::Sha384.digest(b"abc")
        );
    }

    fn enveloped_message(cipher: ContentCipher, payload: &[u8]) -> Pkcs7 {
        let mut rng = rng();
        let mut p7 = Pkcs7::new(ContentType::Enveloped);
        p7.add_recipient(&identity(0).cert).unwrap();
        p7.add_recipient(&identity(1).cert).unwrap();
        p7.set_cipher(cipher).unwrap();
        let mut bio = p7.data_init(&mut rng, None).unwrap();
        bio.feed(payload).unwrap();
        p7.data_final(&mut rng, &mut bio).unwrap();
        p7
    }

    #[test]
    fn enveloped_round_trip() {
        let mut rng = rng();
        let payload = b"for recipients only".repeat(7);
        let p7 = enveloped_message(ContentCipher::Aes256Cbc, &payload);
        let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
        assert_eq!(parsed.recipient_infos().len(), 2);

        for i in 0..2 {
            let who = identity(i);
            let key = who.private_key();
            let mut bio = parsed
                .data_decode(&mut rng, Some(&key), None, Some(&who.cert))
                .unwrap();
            assert_eq!(bio.read_all().unwrap(), payload);

            let mut bio = parsed.data_decode(&mut rng, Some(&key), None, None).unwrap();
            assert_eq!(bio.read_all().unwrap(), payload);
        }
    }

    #[test]
    fn enveloped_recipient_errors() {
        let mut rng = rng();
        let p7 = enveloped_message(ContentCipher::DesEde3Cbc, b"secret");
        let carol = identity(2);
        let key = carol.private_key();

        assert!(matches!(
            p7.data_decode(&mut rng, Some(&key), None, Some(&carol.cert)),
            Err(Error::NoRecipientMatchesCertificate)
        ));
        assert!(matches!(
            p7.data_decode(&mut rng, Some(&key), None, None),
            Err(Error::NoRecipientMatchesKey)
        ));
        assert!(matches!(
            p7.data_decode(&mut rng, Some(&key), None, Some(&identity(0).cert)),
            Err(Error::Decrypt)
        ));
    }
}
