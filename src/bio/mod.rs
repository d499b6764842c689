//! Filter chain: an ordered pipeline of streaming stages.
//!
//! The first stage is the head. Bytes written to the chain pass through
//! every stage from the head towards the terminal stage, which is normally a
//! memory buffer or a null sink. Reading pulls bytes out of the terminal
//! memory buffer and runs them back through the transforms towards the
//! head.
//!
//! ```
//! use pkcs7_engine::bio::{Bio, Stage, StageKind};
//! use pkcs7_engine::DigestAlgorithm;
//!
//! let mut bio = Bio::new(Stage::mem());
//! bio.push(Stage::digest(DigestAlgorithm::Sha256));
//! bio.feed(b"hello world").unwrap();
//! bio.finish().unwrap();
//!
//! assert_eq!(bio.mem().unwrap().as_bytes(), b"hello world");
//! assert!(bio.find(StageKind::Digest).is_some());
//! ```

mod base64;
mod cipher;
mod md;
mod mem;

pub use self::base64::Base64Stage;
pub use self::cipher::{CipherStage, Direction};
pub use self::md::DigestStage;
pub use self::mem::MemBuffer;

use std::io;

use zeroize::Zeroizing;

use crate::algorithms::{ContentCipher, DigestAlgorithm};
use crate::errors::{Error, Result};

/// Size of the chunks pulled from the source when reading.
const READ_CHUNK: usize = 4096;

/// Discriminant of a [`Stage`], used for lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// [`Stage::Mem`].
    Mem,
    /// [`Stage::Digest`].
    Digest,
    /// [`Stage::Cipher`].
    Cipher,
    /// [`Stage::Base64`].
    Base64,
    /// [`Stage::Null`].
    Null,
}

/// One element of a [`Bio`] chain.
#[derive(Debug)]
pub enum Stage {
    /// Growable in-memory buffer. Sink when writing, source when reading.
    Mem(MemBuffer),
    /// Running digest; passes bytes through unchanged.
    Digest(DigestStage),
    /// CBC cipher in encrypt or decrypt mode.
    Cipher(CipherStage),
    /// Base64: encodes when writing, decodes when reading.
    Base64(Base64Stage),
    /// Discards everything written; empty when read.
    Null,
}

impl Stage {
    /// Empty memory buffer.
    pub fn mem() -> Self {
        Stage::Mem(MemBuffer::default())
    }

    /// Memory source holding `data`.
    pub fn mem_with(data: impl Into<Vec<u8>>) -> Self {
        Stage::Mem(MemBuffer::new(data.into()))
    }

    /// Digest stage for `algorithm`.
    pub fn digest(algorithm: DigestAlgorithm) -> Self {
        Stage::Digest(DigestStage::new(algorithm))
    }

    /// Cipher stage; fails with [`Error::ErrorSettingCipher`] on a bad key or IV.
    pub fn cipher(
        cipher: ContentCipher,
        key: &[u8],
        iv: &[u8],
        direction: Direction,
    ) -> Result<Self> {
        CipherStage::new(cipher, key, iv, direction).map(Stage::Cipher)
    }

    /// Base64 codec.
    pub fn base64() -> Self {
        Stage::Base64(Base64Stage::default())
    }

    /// Discriminant of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Mem(_) => StageKind::Mem,
            Stage::Digest(_) => StageKind::Digest,
            Stage::Cipher(_) => StageKind::Cipher,
            Stage::Base64(_) => StageKind::Base64,
            Stage::Null => StageKind::Null,
        }
    }

    /// Transform bytes moving towards the terminal.
    fn write_through(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Stage::Mem(mem) => mem.append(input),
            Stage::Digest(md) => {
                md.update(input);
                out.extend_from_slice(input);
            }
            Stage::Cipher(cipher) => cipher.update(input, out)?,
            Stage::Base64(b64) => b64.encode_update(input, out),
            Stage::Null => {}
        }
        Ok(())
    }

    /// Flush buffered write state.
    fn write_final(&mut self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Stage::Cipher(cipher) => cipher.finalize(out),
            Stage::Base64(b64) => {
                b64.encode_final(out);
                Ok(())
            }
            Stage::Mem(_) | Stage::Digest(_) | Stage::Null => Ok(()),
        }
    }

    /// Transform bytes moving from the source towards the head.
    fn read_through(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Stage::Digest(md) => {
                md.update(input);
                out.extend_from_slice(input);
            }
            Stage::Cipher(cipher) => cipher.update(input, out)?,
            Stage::Base64(b64) => b64.decode_update(input, out)?,
            Stage::Mem(_) | Stage::Null => out.extend_from_slice(input),
        }
        Ok(())
    }

    fn read_final(&mut self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Stage::Cipher(cipher) => cipher.finalize(out),
            Stage::Base64(b64) => b64.decode_final(out),
            Stage::Mem(_) | Stage::Digest(_) | Stage::Null => Ok(()),
        }
    }
}

/// Ordered chain of [`Stage`]s.
#[derive(Debug)]
pub struct Bio {
    stages: Vec<Stage>,
    /// Bytes already pulled through the chain but not yet handed out.
    pending: Zeroizing<Vec<u8>>,
    eof: bool,
}

impl Bio {
    /// Chain consisting of the terminal stage only.
    pub fn new(terminal: Stage) -> Self {
        Bio {
            stages: vec![terminal],
            pending: Zeroizing::new(Vec::new()),
            eof: false,
        }
    }

    /// Prepend `stage`; it becomes the new head.
    pub fn push(&mut self, stage: Stage) -> &mut Self {
        self.stages.insert(0, stage);
        self
    }

    /// Remove and return the head stage. The terminal stage is never popped.
    pub fn pop(&mut self) -> Option<Stage> {
        if self.stages.len() > 1 {
            Some(self.stages.remove(0))
        } else {
            None
        }
    }

    /// Attach `other` after this chain's last stage, dropping this chain's
    /// current terminal.
    pub fn append(&mut self, other: Bio) -> &mut Self {
        self.stages.pop();
        self.stages.extend(other.stages);
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages from head to tail.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Kinds of every stage, head first.
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    /// Index of the first stage of `kind`, searching from the head.
    pub fn find(&self, kind: StageKind) -> Option<usize> {
        self.stages.iter().position(|s| s.kind() == kind)
    }

    /// Stage at `index`.
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// Digest stage computing `algorithm`.
    pub fn digest(&self, algorithm: DigestAlgorithm) -> Option<&DigestStage> {
        self.digests().find(|md| md.algorithm() == algorithm)
    }

    /// Every digest stage, head first.
    pub fn digests(&self) -> impl Iterator<Item = &DigestStage> {
        self.stages.iter().filter_map(|s| match s {
            Stage::Digest(md) => Some(md),
            _ => None,
        })
    }

    /// First memory stage.
    pub fn mem(&self) -> Option<&MemBuffer> {
        self.stages.iter().find_map(|s| match s {
            Stage::Mem(mem) => Some(mem),
            _ => None,
        })
    }

    /// First memory stage, mutably.
    pub fn mem_mut(&mut self) -> Option<&mut MemBuffer> {
        self.stages.iter_mut().find_map(|s| match s {
            Stage::Mem(mem) => Some(mem),
            _ => None,
        })
    }

    /// Write `data` through the chain.
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        self.cascade(0, data.to_vec())
    }

    /// Flush every stage in order: cipher padding and base64 tails are
    /// emitted and pushed on towards the terminal.
    pub fn finish(&mut self) -> Result<()> {
        for i in 0..self.stages.len() {
            let mut tail = Vec::new();
            self.stages[i].write_final(&mut tail)?;
            if !tail.is_empty() {
                self.cascade(i + 1, tail)?;
            }
        }
        Ok(())
    }

    fn cascade(&mut self, from: usize, mut data: Vec<u8>) -> Result<()> {
        for stage in self.stages.iter_mut().skip(from) {
            let mut out = Vec::with_capacity(data.len() + 32);
            stage.write_through(&data, &mut out)?;
            data = out;
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes from the chain. Returns 0 at end of data.
    pub fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        while self.pending.is_empty() && !self.eof {
            self.fill()?;
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    /// Read everything left in the chain.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = self.pull(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    fn fill(&mut self) -> Result<()> {
        let Some((source, transforms)) = self.stages.split_last_mut() else {
            self.eof = true;
            return Ok(());
        };
        let chunk = match source {
            Stage::Mem(mem) => mem.take_chunk(READ_CHUNK),
            Stage::Null => Vec::new(),
            other => return Err(Error::PipelineIntegrity(other.kind())),
        };

        let mut data = chunk;
        if data.is_empty() {
            // Source exhausted: flush transforms from the source side out.
            for i in (0..transforms.len()).rev() {
                let mut tail = Vec::new();
                transforms[i].read_final(&mut tail)?;
                for stage in transforms[..i].iter_mut().rev() {
                    let mut out = Vec::new();
                    stage.read_through(&tail, &mut out)?;
                    tail = out;
                }
                self.pending.extend_from_slice(&tail);
            }
            self.eof = true;
            return Ok(());
        }

        for stage in transforms.iter_mut().rev() {
            let mut out = Vec::with_capacity(data.len() + 32);
            stage.read_through(&data, &mut out)?;
            data = out;
        }
        self.pending.extend_from_slice(&data);
        Ok(())
    }
}

impl io::Write for Bio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.finish().map_err(io::Error::other)
    }
}

impl io::Read for Bio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.pull(buf).map_err(io::Error::other)
    }
}
