//! SignedData produced and checked through the public API.

mod common;

use common::{ec_chain, hello, person, rng, store};
use pkcs7_engine::{
    finalize, sign, verify, Attribute, Content, ContentType, DigestAlgorithm, Error, Flags,
    KeyType, Pkcs7,
};

const HELLO: &[u8] = b"hello world";

fn hello_world() -> Pkcs7 {
    let id = hello();
    let mut p7 = Pkcs7::new(ContentType::Signed);
    p7.content_new(ContentType::Data).unwrap();
    p7.add_signature(&id.cert, id.key.clone(), DigestAlgorithm::Sha256)
        .unwrap()
        .add_signed_attribute(Attribute::content_type(ContentType::Data.oid()).unwrap());
    p7.add_certificate(id.cert.clone()).unwrap();
    finalize(&mut rng(), &mut p7, HELLO, Flags::BINARY).unwrap();
    p7
}

fn verify_hello(p7: &Pkcs7) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    verify(p7, &[], &store(&[&hello().cert]), None, Some(&mut out), Flags::BINARY)?;
    Ok(out)
}

fn replace(haystack: &mut [u8], needle: &[u8], with: &[u8]) {
    let at = haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present");
    haystack[at..at + with.len()].copy_from_slice(with);
}

#[test]
fn hello_world_rsa2048_sha256() {
    let p7 = Pkcs7::from_der(&hello_world().to_der().unwrap()).unwrap();

    assert_eq!(p7.content_type(), ContentType::Signed);
    assert_eq!(p7.signer_infos().len(), 1);
    assert_eq!(p7.signed_content(), Some(HELLO));
    match p7.content() {
        Content::Signed(signed) => {
            let algorithms: Vec<_> = signed.digest_algorithms().iter().map(|a| a.oid).collect();
            assert_eq!(algorithms, vec![DigestAlgorithm::Sha256.oid()]);
        }
        other => panic!("unexpected content {other:?}"),
    }

    let signer = &p7.signer_infos()[0];
    assert_eq!(signer.version(), 1);
    assert_eq!(signer.digest_algorithm().unwrap(), DigestAlgorithm::Sha256);
    assert_eq!(
        signer.message_digest().unwrap(),
        DigestAlgorithm::Sha256.digest(HELLO)
    );
    assert!(signer.signing_time().is_some());

    assert_eq!(verify_hello(&p7).unwrap(), HELLO);
}

#[test]
fn tampered_content_fails() {
    let mut der = hello_world().to_der().unwrap();
    replace(&mut der, HELLO, b"jello world");
    let p7 = Pkcs7::from_der(&der).unwrap();
    assert!(matches!(verify_hello(&p7), Err(Error::NotVerified)));
}

#[test]
fn tampered_signature_fails() {
    let mut der = hello_world().to_der().unwrap();
    // signature OCTET STRING is the last field
    let last = der.len() - 1;
    der[last] ^= 0x01;
    let p7 = Pkcs7::from_der(&der).unwrap();
    assert!(matches!(verify_hello(&p7), Err(Error::NotVerified)));
}

#[test]
fn tampered_message_digest_fails() {
    let mut p7 = hello_world();
    let forged = DigestAlgorithm::Sha256.digest(b"goodbye world");
    p7.signer_infos_mut()[0].add_signed_attribute(Attribute::message_digest(&forged).unwrap());
    assert!(matches!(verify_hello(&p7), Err(Error::NotVerified)));
}

#[test]
fn untrusted_signer_is_rejected() {
    let p7 = hello_world();
    let alice = person(0);
    let err = verify(&p7, &[], &store(&[&alice.cert]), None, None, Flags::BINARY).unwrap_err();
    match err {
        Error::CertificateVerify(msg) => assert_eq!(msg, "Verify error:self signed certificate"),
        other => panic!("unexpected error {other:?}"),
    }

    // the same message passes once chain validation is skipped
    verify(&p7, &[], &store(&[]), None, None, Flags::BINARY | Flags::NO_VERIFY).unwrap();
}

#[test]
fn detached_signature() {
    let alice = person(0);
    let p7 = sign(
        &mut rng(),
        &alice.cert,
        alice.key.clone(),
        &[],
        HELLO,
        Flags::BINARY | Flags::DETACHED,
    )
    .unwrap();
    assert!(p7.is_detached());
    assert_eq!(p7.signed_content(), None);

    let p7 = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
    assert!(p7.is_detached());

    let trust = store(&[&alice.cert]);
    assert!(matches!(
        verify(&p7, &[], &trust, None, None, Flags::BINARY),
        Err(Error::NoContent)
    ));

    let mut out = Vec::new();
    verify(&p7, &[], &trust, Some(HELLO), Some(&mut out), Flags::BINARY).unwrap();
    assert_eq!(out, HELLO);

    assert!(matches!(
        verify(&p7, &[], &trust, Some(&b"hello there"[..]), None, Flags::BINARY),
        Err(Error::NotVerified)
    ));
}

#[test]
fn multiple_signers() {
    let (alice, bob) = (person(0), person(1));
    let mut p7 = Pkcs7::new(ContentType::Signed);
    p7.content_new(ContentType::Data).unwrap();
    p7.add_signature(&alice.cert, alice.key.clone(), DigestAlgorithm::Sha256)
        .unwrap();
    p7.add_signature(&bob.cert, bob.key.clone(), DigestAlgorithm::Sha1)
        .unwrap();
    finalize(&mut rng(), &mut p7, HELLO, Flags::BINARY).unwrap();
    let p7 = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();

    assert_eq!(p7.signer_infos().len(), 2);
    assert!(p7.certificates().is_empty());

    let trust = store(&[&alice.cert, &bob.cert]);
    let certs = [bob.cert.clone(), alice.cert.clone()];
    let signers = p7.signers(&certs, Flags::empty()).unwrap();
    assert_eq!(signers, vec![&alice.cert, &bob.cert]);
    verify(&p7, &certs, &trust, None, None, Flags::BINARY).unwrap();

    assert!(matches!(
        verify(&p7, &certs[..1], &trust, None, None, Flags::BINARY),
        Err(Error::SignerCertificateNotFound)
    ));
    assert!(matches!(
        verify(&p7, &[], &trust, None, None, Flags::BINARY),
        Err(Error::SignerCertificateNotFound)
    ));
}

#[test]
fn multiple_signers_verify_with_either_certificate() {
    let (alice, bob) = (person(0), person(1));
    let mut p7 = Pkcs7::new(ContentType::Signed);
    p7.content_new(ContentType::Data).unwrap();
    p7.add_signature(&alice.cert, alice.key.clone(), DigestAlgorithm::Sha256)
        .unwrap()
        .add_signed_attribute(Attribute::content_type(ContentType::Data.oid()).unwrap());
    p7.add_signature(&bob.cert, bob.key.clone(), DigestAlgorithm::Sha256)
        .unwrap()
        .add_signed_attribute(Attribute::content_type(ContentType::Data.oid()).unwrap());
    p7.add_certificate(alice.cert.clone()).unwrap();
    p7.add_certificate(bob.cert.clone()).unwrap();
    finalize(&mut rng(), &mut p7, HELLO, Flags::BINARY).unwrap();
    let p7 = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();

    let trust = store(&[&alice.cert, &bob.cert]);
    for cert in [&alice.cert, &bob.cert] {
        let mut out = Vec::new();
        verify(
            &p7,
            &[cert.clone()],
            &trust,
            None,
            Some(&mut out),
            Flags::BINARY,
        )
        .unwrap();
        assert_eq!(out, HELLO);
    }

    // a supplied certificate is preferred over the embedded copy
    let supplied = [bob.cert.clone()];
    let signers = p7.signers(&supplied, Flags::empty()).unwrap();
    assert_eq!(signers, vec![&alice.cert, &bob.cert]);
    assert!(p7.certificates().iter().any(|c| std::ptr::eq(c, signers[0])));
    assert!(std::ptr::eq(signers[1], &supplied[0]));
}

#[test]
fn embedded_certificates_and_no_intern() {
    let alice = person(0);
    let p7 = sign(&mut rng(), &alice.cert, alice.key.clone(), &[], HELLO, Flags::BINARY).unwrap();
    assert_eq!(p7.certificates(), &[alice.cert.clone()]);

    let trust = store(&[&alice.cert]);
    verify(&p7, &[], &trust, None, None, Flags::BINARY).unwrap();
    assert!(matches!(
        verify(&p7, &[], &trust, None, None, Flags::BINARY | Flags::NO_INTERN),
        Err(Error::SignerCertificateNotFound)
    ));
    verify(
        &p7,
        &[alice.cert.clone()],
        &trust,
        None,
        None,
        Flags::BINARY | Flags::NO_INTERN,
    )
    .unwrap();
}

#[test]
fn ec_signer_issued_by_rsa_ca() {
    let (ca, leaf) = ec_chain();
    assert_eq!(leaf.key.key_type(), KeyType::Ec);

    let p7 = sign(&mut rng(), &leaf.cert, leaf.key.clone(), &[], HELLO, Flags::BINARY).unwrap();
    let p7 = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
    assert_eq!(
        p7.signer_infos()[0].digest_algorithm().unwrap(),
        DigestAlgorithm::Sha1
    );

    let mut out = Vec::new();
    verify(&p7, &[], &store(&[ca]), None, Some(&mut out), Flags::BINARY).unwrap();
    assert_eq!(out, HELLO);

    // the leaf alone is not a trust anchor for itself
    assert!(matches!(
        verify(&p7, &[], &store(&[]), None, None, Flags::BINARY),
        Err(Error::CertificateVerify(_))
    ));
}

#[test]
fn text_mode_round_trip() {
    let alice = person(0);
    let p7 = sign(
        &mut rng(),
        &alice.cert,
        alice.key.clone(),
        &[],
        b"line one\nline two\n",
        Flags::TEXT,
    )
    .unwrap();
    assert_eq!(
        p7.signed_content().unwrap(),
        b"Content-Type: text/plain\r\n\r\nline one\r\nline two\r\n"
    );

    let mut out = Vec::new();
    verify(&p7, &[], &store(&[&alice.cert]), None, Some(&mut out), Flags::TEXT).unwrap();
    assert_eq!(out, b"line one\r\nline two\r\n");
}
