//! Object identifiers and the process-wide OID ⇄ name table.
//!
//! The table is built on first use and never mutated afterwards, so lookups
//! from any thread see the same data without locking.

use const_oid::ObjectIdentifier;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `pkcs7-data`
pub const PKCS7_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// `pkcs7-signedData`
pub const PKCS7_SIGNED: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// `pkcs7-envelopedData`
pub const PKCS7_ENVELOPED: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
/// `pkcs7-signedAndEnvelopedData`
pub const PKCS7_SIGNED_AND_ENVELOPED: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.4");
/// `pkcs7-digestData`
pub const PKCS7_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.5");
/// `pkcs7-encryptedData`
pub const PKCS7_ENCRYPTED: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");

/// PKCS#9 `contentType`
pub const CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// PKCS#9 `messageDigest`
pub const MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// PKCS#9 `signingTime`
pub const SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// PKCS#9 `smimeCapabilities`
pub const SMIME_CAPABILITIES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.15");

/// `sha1`
pub const SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// `sha224`
pub const SHA224: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.4");
/// `sha256`
pub const SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
/// `sha384`
pub const SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
/// `sha512`
pub const SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// `rsaEncryption`
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// `sha1WithRSAEncryption`
pub const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
/// `sha256WithRSAEncryption`
pub const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
/// `sha384WithRSAEncryption`
pub const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
/// `sha512WithRSAEncryption`
pub const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
/// `sha224WithRSAEncryption`
pub const SHA224_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");

/// `dsaEncryption`
pub const DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
/// `dsaWithSHA1`
pub const DSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.3");

/// `id-ecPublicKey`
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// `ecdsa-with-SHA1`
pub const ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
/// `ecdsa-with-SHA224`
pub const ECDSA_WITH_SHA224: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1");
/// `ecdsa-with-SHA256`
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
/// `ecdsa-with-SHA384`
pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
/// `ecdsa-with-SHA512`
pub const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

/// `des-cbc`
pub const DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
/// `des-ede3-cbc`
pub const DES_EDE3_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");
/// `rc2-cbc`
pub const RC2_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.2");
/// `aes-128-cbc`
pub const AES_128_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
/// `aes-192-cbc`
pub const AES_192_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
/// `aes-256-cbc`
pub const AES_256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");

/// `extKeyUsage` extension
pub const EXT_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");
/// `anyExtendedKeyUsage`
pub const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");
/// `emailProtection` key purpose
pub const EMAIL_PROTECTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.4");

/// Short and long name of a registered object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectName {
    /// OpenSSL short name, e.g. `SHA256`.
    pub short_name: &'static str,
    /// OpenSSL long name, e.g. `sha256`.
    pub long_name: &'static str,
}

struct Registry {
    by_oid: HashMap<ObjectIdentifier, ObjectName>,
    by_name: HashMap<String, ObjectIdentifier>,
}

const ENTRIES: &[(ObjectIdentifier, &str, &str)] = &[
    (PKCS7_DATA, "pkcs7-data", "pkcs7-data"),
    (PKCS7_SIGNED, "pkcs7-signedData", "pkcs7-signedData"),
    (PKCS7_ENVELOPED, "pkcs7-envelopedData", "pkcs7-envelopedData"),
    (PKCS7_SIGNED_AND_ENVELOPED, "pkcs7-signedAndEnvelopedData", "pkcs7-signedAndEnvelopedData"),
    (PKCS7_DIGEST, "pkcs7-digestData", "pkcs7-digestData"),
    (PKCS7_ENCRYPTED, "pkcs7-encryptedData", "pkcs7-encryptedData"),
    (CONTENT_TYPE, "contentType", "contentType"),
    (MESSAGE_DIGEST, "messageDigest", "messageDigest"),
    (SIGNING_TIME, "signingTime", "signingTime"),
    (SMIME_CAPABILITIES, "SMIME-CAPS", "S/MIME Capabilities"),
    (SHA1, "SHA1", "sha1"),
    (SHA224, "SHA224", "sha224"),
    (SHA256, "SHA256", "sha256"),
    (SHA384, "SHA384", "sha384"),
    (SHA512, "SHA512", "sha512"),
    (RSA_ENCRYPTION, "rsaEncryption", "rsaEncryption"),
    (SHA1_WITH_RSA, "RSA-SHA1", "sha1WithRSAEncryption"),
    (SHA224_WITH_RSA, "RSA-SHA224", "sha224WithRSAEncryption"),
    (SHA256_WITH_RSA, "RSA-SHA256", "sha256WithRSAEncryption"),
    (SHA384_WITH_RSA, "RSA-SHA384", "sha384WithRSAEncryption"),
    (SHA512_WITH_RSA, "RSA-SHA512", "sha512WithRSAEncryption"),
    (DSA, "DSA", "dsaEncryption"),
    (DSA_WITH_SHA1, "DSA-SHA1", "dsaWithSHA1"),
    (EC_PUBLIC_KEY, "id-ecPublicKey", "id-ecPublicKey"),
    (ECDSA_WITH_SHA1, "ecdsa-with-SHA1", "ecdsa-with-SHA1"),
    (ECDSA_WITH_SHA224, "ecdsa-with-SHA224", "ecdsa-with-SHA224"),
    (ECDSA_WITH_SHA256, "ecdsa-with-SHA256", "ecdsa-with-SHA256"),
    (ECDSA_WITH_SHA384, "ecdsa-with-SHA384", "ecdsa-with-SHA384"),
    (ECDSA_WITH_SHA512, "ecdsa-with-SHA512", "ecdsa-with-SHA512"),
    (DES_CBC, "DES-CBC", "des-cbc"),
    (DES_EDE3_CBC, "DES-EDE3-CBC", "des-ede3-cbc"),
    (RC2_CBC, "RC2-CBC", "rc2-cbc"),
    (AES_128_CBC, "AES-128-CBC", "aes-128-cbc"),
    (AES_192_CBC, "AES-192-CBC", "aes-192-cbc"),
    (AES_256_CBC, "AES-256-CBC", "aes-256-cbc"),
    (EXT_KEY_USAGE, "extendedKeyUsage", "X509v3 Extended Key Usage"),
    (ANY_EXTENDED_KEY_USAGE, "anyExtendedKeyUsage", "Any Extended Key Usage"),
    (EMAIL_PROTECTION, "emailProtection", "E-mail Protection"),
];

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut by_oid = HashMap::with_capacity(ENTRIES.len());
        let mut by_name = HashMap::with_capacity(ENTRIES.len() * 2);
        for &(oid, short_name, long_name) in ENTRIES {
            by_oid.insert(
                oid,
                ObjectName {
                    short_name,
                    long_name,
                },
            );
            by_name.insert(short_name.to_ascii_lowercase(), oid);
            by_name.insert(long_name.to_ascii_lowercase(), oid);
        }
        Registry { by_oid, by_name }
    })
}

/// Names registered for `oid`.
pub fn lookup(oid: &ObjectIdentifier) -> Option<ObjectName> {
    registry().by_oid.get(oid).copied()
}

/// OID registered under a short or long name, ignoring ASCII case.
pub fn oid_for_name(name: &str) -> Option<ObjectIdentifier> {
    registry().by_name.get(&name.to_ascii_lowercase()).copied()
}

/// Short name of `oid`, or its dotted form when unregistered.
pub fn short_name(oid: &ObjectIdentifier) -> String {
    match lookup(oid) {
        Some(name) => name.short_name.to_owned(),
        None => oid.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_both_ways() {
        assert_eq!(oid_for_name("des-ede3-cbc"), Some(DES_EDE3_CBC));
        assert_eq!(oid_for_name("DES-EDE3-CBC"), Some(DES_EDE3_CBC));
        assert_eq!(oid_for_name("sha256"), Some(SHA256));
        assert_eq!(lookup(&SHA256).map(|n| n.short_name), Some("SHA256"));
        assert_eq!(short_name(&RSA_ENCRYPTION), "rsaEncryption");
    }

    #[test]
    fn unknown_oid_prints_dotted() {
        let oid = ObjectIdentifier::new_unwrap("1.2.3.4");
        assert_eq!(lookup(&oid), None);
        assert_eq!(short_name(&oid), "1.2.3.4");
        assert_eq!(oid_for_name("no-such-cipher"), None);
    }

    #[test]
    fn every_oid_registered_once() {
        let mut seen = std::collections::HashSet::new();
        for (oid, _, _) in ENTRIES {
            assert!(seen.insert(*oid), "{oid} listed twice");
        }
    }
}
