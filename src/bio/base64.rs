use base64ct::{Base64, Encoding};

use crate::errors::{Error, Result};

/// Raw bytes per encoded output line (64 characters).
const LINE_BYTES: usize = 48;

/// Base64 codec stage. Encoded output is broken into 64-column lines.
#[derive(Debug, Default)]
pub struct Base64Stage {
    raw: Vec<u8>,
    text: Vec<u8>,
}

impl Base64Stage {
    pub(crate) fn encode_update(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.raw.extend_from_slice(input);
        let full = self.raw.len() - self.raw.len() % LINE_BYTES;
        for line in self.raw[..full].chunks(LINE_BYTES) {
            out.extend_from_slice(Base64::encode_string(line).as_bytes());
            out.push(b'\n');
        }
        self.raw.drain(..full);
    }

    pub(crate) fn encode_final(&mut self, out: &mut Vec<u8>) {
        if !self.raw.is_empty() {
            out.extend_from_slice(Base64::encode_string(&self.raw).as_bytes());
            out.push(b'\n');
            self.raw.clear();
        }
    }

    pub(crate) fn decode_update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.text
            .extend(input.iter().copied().filter(|b| !b.is_ascii_whitespace()));
        // Hold back the last quad: it may carry padding.
        let quads = self.text.len() / 4;
        if quads < 2 {
            return Ok(());
        }
        let ready = (quads - 1) * 4;
        self.decode_into(ready, out)
    }

    pub(crate) fn decode_final(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.text.len() % 4 != 0 {
            return Err(Error::Pem);
        }
        self.decode_into(self.text.len(), out)
    }

    fn decode_into(&mut self, len: usize, out: &mut Vec<u8>) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let text = core::str::from_utf8(&self.text[..len]).map_err(|_| Error::Pem)?;
        out.extend_from_slice(&Base64::decode_vec(text)?);
        self.text.drain(..len);
        Ok(())
    }
}
