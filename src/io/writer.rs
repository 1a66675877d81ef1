//! Output buffers for the encoder set.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::reader::Endianness;

/// Growable binary output buffer with explicit endianness.
pub struct BinaryWriter {
    data: Vec<u8>,
    endianness: Endianness,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new(endianness: Endianness) -> Self {
        Self { data: Vec::new(), endianness }
    }

    /// Create a writer with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize, endianness: Endianness) -> Self {
        Self { data: Vec::with_capacity(capacity), endianness }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the writer, returning the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Append an unsigned 16-bit value.
    pub fn write_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        match self.endianness {
            Endianness::Little => LittleEndian::write_u16(&mut buf, value),
            Endianness::Big => BigEndian::write_u16(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    /// Append an unsigned 32-bit value.
    pub fn write_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        match self.endianness {
            Endianness::Little => LittleEndian::write_u32(&mut buf, value),
            Endianness::Big => BigEndian::write_u32(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    /// Append a signed 32-bit value.
    pub fn write_i32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        match self.endianness {
            Endianness::Little => LittleEndian::write_i32(&mut buf, value),
            Endianness::Big => BigEndian::write_i32(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    /// Append a 32-bit float.
    pub fn write_f32(&mut self, value: f32) {
        let mut buf = [0u8; 4];
        match self.endianness {
            Endianness::Little => LittleEndian::write_f32(&mut buf, value),
            Endianness::Big => BigEndian::write_f32(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    /// Append a 64-bit float.
    pub fn write_f64(&mut self, value: f64) {
        let mut buf = [0u8; 8];
        match self.endianness {
            Endianness::Little => LittleEndian::write_f64(&mut buf, value),
            Endianness::Big => BigEndian::write_f64(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }
}

/// Line-oriented text output buffer for the text encoder family.
pub struct TextWriter {
    data: String,
    indent: usize,
}

impl TextWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { data: String::new(), indent: 0 }
    }

    /// Increase the indentation of subsequent lines.
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decrease the indentation of subsequent lines.
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Append one line, applying the current indentation.
    pub fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.data.push_str("  ");
        }
        self.data.push_str(line);
        self.data.push('\n');
    }

    /// Consume the writer, returning the content as bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_bytes()
    }

    /// Borrow the accumulated content.
    pub fn as_str(&self) -> &str {
        &self.data
    }
}

impl Default for TextWriter {
    fn default() -> Self {
        Self::new()
    }
}
