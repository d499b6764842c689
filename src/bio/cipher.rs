use core::fmt;

use cipher::block_padding::{Pkcs7, RawPadding};
use cipher::generic_array::GenericArray;
use cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit, KeyIvInit};
use zeroize::Zeroizing;

use crate::algorithms::{ContentCipher, RC2_EFFECTIVE_BITS};
use crate::errors::{Error, Result};

/// Whether a [`CipherStage`] encrypts or decrypts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Encrypt and pad.
    Encrypt,
    /// Decrypt and strip padding.
    Decrypt,
}

/// CBC state for one block cipher and direction.
trait BlockMode {
    fn process_blocks(&mut self, data: &mut [u8], block_size: usize);
}

struct Encrypting<M>(M);

struct Decrypting<M>(M);

impl<M: BlockEncryptMut> BlockMode for Encrypting<M> {
    fn process_blocks(&mut self, data: &mut [u8], block_size: usize) {
        for block in data.chunks_exact_mut(block_size) {
            self.0.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

impl<M: BlockDecryptMut> BlockMode for Decrypting<M> {
    fn process_blocks(&mut self, data: &mut [u8], block_size: usize) {
        for block in data.chunks_exact_mut(block_size) {
            self.0.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

fn cbc_mode<C>(key: &[u8], iv: &[u8], direction: Direction) -> Result<Box<dyn BlockMode>>
where
    C: BlockCipher + BlockEncryptMut + BlockDecryptMut + KeyInit + 'static,
{
    Ok(match direction {
        Direction::Encrypt => Box::new(Encrypting(
            cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|_| Error::ErrorSettingCipher)?,
        )),
        Direction::Decrypt => Box::new(Decrypting(
            cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| Error::ErrorSettingCipher)?,
        )),
    })
}

fn rc2_mode(
    key: &[u8],
    effective_bits: u16,
    iv: &[u8],
    direction: Direction,
) -> Result<Box<dyn BlockMode>> {
    if key.is_empty() || key.len() > 128 || !RC2_EFFECTIVE_BITS.contains(&effective_bits) {
        return Err(Error::ErrorSettingCipher);
    }
    let rc2 = rc2::Rc2::new_with_eff_key_len(key, usize::from(effective_bits));
    Ok(match direction {
        Direction::Encrypt => Box::new(Encrypting(
            cbc::Encryptor::<rc2::Rc2>::inner_iv_slice_init(rc2, iv)
                .map_err(|_| Error::ErrorSettingCipher)?,
        )),
        Direction::Decrypt => Box::new(Decrypting(
            cbc::Decryptor::<rc2::Rc2>::inner_iv_slice_init(rc2, iv)
                .map_err(|_| Error::ErrorSettingCipher)?,
        )),
    })
}

/// Symmetric cipher stage with PKCS#7 padding.
///
/// When decrypting, the last complete block is held back until
/// [`finalize`](CipherStage::finalize) so the padding can be stripped.
pub struct CipherStage {
    cipher: ContentCipher,
    direction: Direction,
    mode: Box<dyn BlockMode>,
    buf: Zeroizing<Vec<u8>>,
    finished: bool,
}

impl CipherStage {
    /// Key the stage. The IV must be exactly one block.
    pub fn new(cipher: ContentCipher, key: &[u8], iv: &[u8], direction: Direction) -> Result<Self> {
        if iv.len() != cipher.block_size() {
            return Err(Error::ErrorSettingCipher);
        }
        let mode = match cipher {
            ContentCipher::DesCbc => cbc_mode::<des::Des>(key, iv, direction)?,
            ContentCipher::DesEde3Cbc => cbc_mode::<des::TdesEde3>(key, iv, direction)?,
            ContentCipher::Rc2Cbc { effective_bits } => {
                rc2_mode(key, effective_bits, iv, direction)?
            }
            ContentCipher::Aes128Cbc => cbc_mode::<aes::Aes128>(key, iv, direction)?,
            ContentCipher::Aes192Cbc => cbc_mode::<aes::Aes192>(key, iv, direction)?,
            ContentCipher::Aes256Cbc => cbc_mode::<aes::Aes256>(key, iv, direction)?,
        };
        Ok(CipherStage {
            cipher,
            direction,
            mode,
            buf: Zeroizing::new(Vec::new()),
            finished: false,
        })
    }

    /// Cipher this stage was keyed for.
    pub fn cipher(&self) -> ContentCipher {
        self.cipher
    }

    /// Encrypt or decrypt.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Err(Error::CipherNotInitialized);
        }
        let bs = self.cipher.block_size();
        self.buf.extend_from_slice(input);

        let ready = match self.direction {
            Direction::Encrypt => self.buf.len() - self.buf.len() % bs,
            Direction::Decrypt if self.buf.len() <= bs => 0,
            Direction::Decrypt => (self.buf.len() - 1) / bs * bs,
        };
        if ready == 0 {
            return Ok(());
        }

        let mut chunk: Zeroizing<Vec<u8>> = Zeroizing::new(self.buf.drain(..ready).collect());
        self.mode.process_blocks(&mut chunk, bs);
        out.extend_from_slice(&chunk);
        Ok(())
    }

    pub(crate) fn finalize(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let bs = self.cipher.block_size();

        match self.direction {
            Direction::Encrypt => {
                let used = self.buf.len();
                let mut block = Zeroizing::new(vec![0u8; bs]);
                block[..used].copy_from_slice(&self.buf);
                Pkcs7::raw_pad(&mut block, used);
                self.mode.process_blocks(&mut block, bs);
                out.extend_from_slice(&block);
            }
            Direction::Decrypt => {
                if self.buf.len() != bs {
                    return Err(Error::Decrypt);
                }
                self.mode.process_blocks(self.buf.as_mut_slice(), bs);
                let plain = Pkcs7::raw_unpad(&self.buf).map_err(|_| Error::Decrypt)?;
                out.extend_from_slice(plain);
            }
        }
        self.buf.clear();
        Ok(())
    }
}

impl fmt::Debug for CipherStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherStage")
            .field("cipher", &self.cipher)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn run(stage: &mut CipherStage, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        stage.update(data, &mut out)?;
        stage.finalize(&mut out)?;
        Ok(out)
    }

    #[test]
    fn aes128_cbc_known_answer() {
        // NIST SP 800-38A F.2.1, first block, followed by a full padding block.
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex!("000102030405060708090a0b0c0d0e0f");
        let pt = hex!("6bc1bee22e409f96e93d7e117393172a");
        let mut enc = CipherStage::new(ContentCipher::Aes128Cbc, &key, &iv, Direction::Encrypt).unwrap();
        let ct = run(&mut enc, &pt).unwrap();
        assert_eq!(ct.len(), 32);
        assert_eq!(ct[..16], hex!("7649abac8119b246cee98e9b12e9197d"));

        let mut dec = CipherStage::new(ContentCipher::Aes128Cbc, &key, &iv, Direction::Decrypt).unwrap();
        assert_eq!(run(&mut dec, &ct).unwrap(), pt);
    }

    #[test]
    fn every_cipher_round_trips() {
        let ciphers = [
            ContentCipher::DesCbc,
            ContentCipher::DesEde3Cbc,
            ContentCipher::Rc2Cbc { effective_bits: 40 },
            ContentCipher::Rc2Cbc { effective_bits: 64 },
            ContentCipher::Rc2Cbc { effective_bits: 128 },
            ContentCipher::Aes128Cbc,
            ContentCipher::Aes192Cbc,
            ContentCipher::Aes256Cbc,
        ];
        for cipher in ciphers {
            let key = vec![0x42u8; cipher.key_len()];
            let iv = vec![0x24u8; cipher.block_size()];
            for len in [0usize, 1, 7, 8, 15, 16, 33] {
                let pt = vec![0xa5u8; len];
                let mut enc = CipherStage::new(cipher, &key, &iv, Direction::Encrypt).unwrap();
                let ct = run(&mut enc, &pt).unwrap();
                assert_eq!(ct.len(), (len / cipher.block_size() + 1) * cipher.block_size());
                let mut dec = CipherStage::new(cipher, &key, &iv, Direction::Decrypt).unwrap();
                assert_eq!(run(&mut dec, &ct).unwrap(), pt, "{cipher} len {len}");
            }
        }
    }

    #[test]
    fn bad_key_or_iv_length() {
        assert!(matches!(
            CipherStage::new(ContentCipher::Aes128Cbc, &[0u8; 15], &[0u8; 16], Direction::Encrypt),
            Err(Error::ErrorSettingCipher)
        ));
        assert!(matches!(
            CipherStage::new(ContentCipher::DesCbc, &[0u8; 8], &[0u8; 16], Direction::Encrypt),
            Err(Error::ErrorSettingCipher)
        ));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let key = [1u8; 16];
        let iv = [2u8; 16];
        let mut dec = CipherStage::new(ContentCipher::Aes128Cbc, &key, &iv, Direction::Decrypt).unwrap();
        assert!(matches!(run(&mut dec, &[0u8; 20]), Err(Error::Decrypt)));
    }

    #[test]
    fn corrupt_padding_fails() {
        let key = [3u8; 8];
        let iv = [4u8; 8];
        let mut enc = CipherStage::new(ContentCipher::DesCbc, &key, &iv, Direction::Encrypt).unwrap();
        let ct = run(&mut enc, b"12345678").unwrap();
        assert_eq!(ct.len(), 16);
        // first block alone decrypts to "12345678", whose last byte is not valid padding
        let mut dec = CipherStage::new(ContentCipher::DesCbc, &key, &iv, Direction::Decrypt).unwrap();
        assert!(matches!(run(&mut dec, &ct[..8]), Err(Error::Decrypt)));
    }

    #[test]
    fn final_block_carries_pkcs7_padding() {
        // decrypt without unpadding to inspect the padding bytes
        let key = [5u8; 16];
        let iv = [6u8; 16];
        let mut enc = CipherStage::new(ContentCipher::Aes128Cbc, &key, &iv, Direction::Encrypt).unwrap();
        let ct = run(&mut enc, b"abc").unwrap();
        let mut raw = ct.clone();
        let mut mode = cbc_mode::<aes::Aes128>(&key, &iv, Direction::Decrypt).unwrap();
        mode.process_blocks(&mut raw, 16);
        assert_eq!(&raw[..3], b"abc");
        assert!(raw[3..].iter().all(|&b| b == 13));
    }

    #[test]
    fn write_after_finalize_is_rejected() {
        let mut enc =
            CipherStage::new(ContentCipher::Aes256Cbc, &[0u8; 32], &[0u8; 16], Direction::Encrypt).unwrap();
        run(&mut enc, b"data").unwrap();
        let mut out = Vec::new();
        assert!(matches!(enc.update(b"more", &mut out), Err(Error::CipherNotInitialized)));
    }
}
