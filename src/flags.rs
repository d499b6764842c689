//! S/MIME processing flags.

use bitflags::bitflags;

bitflags! {
    /// Options accepted by [`sign`](crate::sign), [`verify`](crate::verify),
    /// [`encrypt`](crate::encrypt) and [`decrypt`](crate::decrypt).
    ///
    /// Bit values are the ones OpenSSL assigns to its `PKCS7_*` flags so
    /// callers can pass integers straight through.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        /// Treat content as `text/plain`: add the MIME header when writing, strip it when reading.
        const TEXT = 0x1;
        /// Do not embed the signer certificate.
        const NO_CERTS = 0x2;
        /// Skip signature checks.
        const NO_SIGS = 0x4;
        /// Do not use message certificates as untrusted chain material.
        const NO_CHAIN = 0x8;
        /// Ignore certificates embedded in the message when looking up signers.
        const NO_INTERN = 0x10;
        /// Skip chain validation of signer certificates.
        const NO_VERIFY = 0x20;
        /// Produce a signature without embedded content.
        const DETACHED = 0x40;
        /// Copy content verbatim, no CRLF canonicalisation.
        const BINARY = 0x80;
        /// Do not add any signed attributes.
        const NO_ATTR = 0x100;
        /// Do not add the SMIMECapabilities attribute.
        const NO_SMIME_CAP = 0x200;
        /// Accepted for compatibility; has no effect.
        const NO_OLD_MIME_TYPE = 0x400;
        /// Accepted for compatibility; has no effect.
        const CRLF_EOL = 0x800;
        /// Return the message before finalisation so the caller can stream content.
        const STREAM = 0x1000;
        /// Do not consult the message's CRLs during chain validation.
        const NO_CRL = 0x2000;
        /// Treated like [`Flags::STREAM`].
        const PARTIAL = 0x4000;
        /// Accepted for compatibility; has no effect.
        const REUSE_DIGEST = 0x8000;
    }
}
