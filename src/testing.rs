//! Keys and certificates shared by the unit tests.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;
use x509_cert::Certificate;

use crate::keys::PrivateKey;

pub(crate) struct Identity {
    pub key: RsaPrivateKey,
    pub cert: Certificate,
}

impl Identity {
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::Rsa(self.key.clone())
    }
}

pub(crate) fn rng() -> ChaCha8Rng {
    ChaCha8Rng::from_seed([42; 32])
}

/// One of three self-signed RSA-1024 identities, generated once.
pub(crate) fn identity(index: usize) -> &'static Identity {
    static IDENTITIES: OnceLock<Vec<Identity>> = OnceLock::new();
    let all = IDENTITIES.get_or_init(|| {
        ["alice", "bob", "carol"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut rng = ChaCha8Rng::from_seed([i as u8 + 1; 32]);
                let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
                let cert = self_signed(&key, name, i as u32 + 1);
                Identity { key, cert }
            })
            .collect()
    });
    &all[index]
}

pub(crate) fn self_signed(key: &RsaPrivateKey, common_name: &str, serial: u32) -> Certificate {
    let spki = SubjectPublicKeyInfoOwned::from_key(key.to_public_key()).unwrap();
    issue(Profile::Root, key, common_name, serial, spki)
}

/// DSA-1024 key with a certificate issued by alice.
pub(crate) fn dsa_identity() -> &'static (dsa::SigningKey, Certificate) {
    static DSA: OnceLock<(dsa::SigningKey, Certificate)> = OnceLock::new();
    DSA.get_or_init(|| {
        let mut rng = ChaCha8Rng::from_seed([0x40; 32]);
        let components = dsa::Components::generate(&mut rng, dsa::KeySize::DSA_1024_160);
        let key = dsa::SigningKey::generate(&mut rng, components);
        let spki = SubjectPublicKeyInfoOwned::from_key(key.verifying_key().clone()).unwrap();
        let alice = identity(0);
        let profile = Profile::Leaf {
            issuer: alice.cert.tbs_certificate.subject.clone(),
            enable_key_agreement: false,
            enable_key_encipherment: false,
        };
        let cert = issue(profile, &alice.key, "dave", 4, spki);
        (key, cert)
    })
}

fn issue(
    profile: Profile,
    issuer_key: &RsaPrivateKey,
    common_name: &str,
    serial: u32,
    spki: SubjectPublicKeyInfoOwned,
) -> Certificate {
    let subject = Name::from_str(&format!("CN={common_name},O=Example,C=US")).unwrap();
    let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(issuer_key.clone());
    CertificateBuilder::new(
        profile,
        SerialNumber::from(serial),
        Validity::from_now(Duration::from_secs(3600)).unwrap(),
        subject,
        spki,
        &signer,
    )
    .unwrap()
    .build::<rsa::pkcs1v15::Signature>()
    .unwrap()
}
