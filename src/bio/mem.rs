use zeroize::Zeroizing;

/// In-memory buffer stage.
#[derive(Default)]
pub struct MemBuffer {
    data: Zeroizing<Vec<u8>>,
    read_pos: usize,
}

impl MemBuffer {
    /// Buffer pre-filled with `data`.
    pub fn new(data: Vec<u8>) -> Self {
        MemBuffer {
            data: Zeroizing::new(data),
            read_pos: 0,
        }
    }

    /// Unread contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.read_pos..]
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.read_pos
    }

    /// Whether every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub(crate) fn take_chunk(&mut self, max: usize) -> Vec<u8> {
        let end = self.data.len().min(self.read_pos + max);
        let chunk = self.data[self.read_pos..end].to_vec();
        self.read_pos = end;
        chunk
    }
}

impl core::fmt::Debug for MemBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemBuffer").field("len", &self.len()).finish()
    }
}
