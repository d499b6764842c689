use core::fmt;

use digest::DynDigest;

use crate::algorithms::DigestAlgorithm;

/// Digest accumulator stage.
pub struct DigestStage {
    algorithm: DigestAlgorithm,
    hasher: Box<dyn DynDigest>,
}

impl DigestStage {
    /// Empty accumulator for `algorithm`.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        DigestStage {
            algorithm,
            hasher: algorithm.new_hasher(),
        }
    }

    /// Digest being computed.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Digest of everything seen so far. The running state is cloned, so
    /// the stage keeps accumulating.
    pub fn current(&self) -> Vec<u8> {
        self.hasher.box_clone().finalize().into_vec()
    }
}

impl fmt::Debug for DigestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestStage")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
