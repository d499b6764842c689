//! Certificates and keys shared by the integration tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use pkcs7_engine::{PrivateKey, TrustStore};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{EncodePublicKey, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;
use x509_cert::Certificate;

pub struct Identity {
    pub key: PrivateKey,
    pub cert: Certificate,
}

pub fn rng() -> ChaCha8Rng {
    ChaCha8Rng::from_seed([7; 32])
}

// WARNING: 1024-bit keys keep the tests fast. Never use them elsewhere.
fn rsa_key(seed: u8, bits: usize) -> RsaPrivateKey {
    let mut rng = ChaCha8Rng::from_seed([seed; 32]);
    RsaPrivateKey::new(&mut rng, bits).unwrap()
}

fn build<K: EncodePublicKey>(
    profile: Profile,
    serial: u32,
    subject: &str,
    public: K,
    issuer_key: &RsaPrivateKey,
) -> Certificate {
    let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(issuer_key.clone());
    CertificateBuilder::new(
        profile,
        SerialNumber::from(serial),
        Validity::from_now(Duration::from_secs(24 * 3600)).unwrap(),
        Name::from_str(subject).unwrap(),
        SubjectPublicKeyInfoOwned::from_key(public).unwrap(),
        &signer,
    )
    .unwrap()
    .build::<rsa::pkcs1v15::Signature>()
    .unwrap()
}

fn self_signed(seed: u8, bits: usize, serial: u32, subject: &str) -> (RsaPrivateKey, Certificate) {
    let key = rsa_key(seed, bits);
    let cert = build(Profile::Root, serial, subject, key.to_public_key(), &key);
    (key, cert)
}

/// Self-signed RSA-2048 signer.
pub fn hello() -> &'static Identity {
    static ID: OnceLock<Identity> = OnceLock::new();
    ID.get_or_init(|| {
        let (key, cert) = self_signed(0x10, 2048, 100, "CN=Hello World,O=Example,C=US");
        Identity { key: key.into(), cert }
    })
}

/// Self-signed RSA-1024 identities: alice, bob and carol.
pub fn person(index: usize) -> &'static Identity {
    static PEOPLE: OnceLock<Vec<Identity>> = OnceLock::new();
    let people = PEOPLE.get_or_init(|| {
        ["alice", "bob", "carol"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let subject = format!("CN={name},O=Example,C=US");
                let (key, cert) = self_signed(0x20 + i as u8, 1024, 200 + i as u32, &subject);
                Identity { key: key.into(), cert }
            })
            .collect()
    });
    &people[index]
}

/// RSA certificate authority and a P-256 leaf it issued.
pub fn ec_chain() -> &'static (Certificate, Identity) {
    static CHAIN: OnceLock<(Certificate, Identity)> = OnceLock::new();
    CHAIN.get_or_init(|| {
        let (ca_key, ca_cert) = self_signed(0x30, 1024, 300, "CN=Example CA,O=Example,C=US");
        let mut rng = ChaCha8Rng::from_seed([0x31; 32]);
        let leaf_key = p256::ecdsa::SigningKey::random(&mut rng);
        let profile = Profile::Leaf {
            issuer: ca_cert.tbs_certificate.subject.clone(),
            enable_key_agreement: false,
            enable_key_encipherment: false,
        };
        let leaf_cert = build(
            profile,
            301,
            "CN=ec signer,O=Example,C=US",
            p256::ecdsa::VerifyingKey::from(&leaf_key),
            &ca_key,
        );
        (ca_cert, Identity { key: leaf_key.into(), cert: leaf_cert })
    })
}

pub fn store(anchors: &[&Certificate]) -> TrustStore {
    let mut store = TrustStore::new();
    for cert in anchors {
        store.add_anchor((*cert).clone());
    }
    store
}
