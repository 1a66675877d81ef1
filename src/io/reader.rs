//! Bounds-checked binary cursor for the binary decoder family.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::util::{Error, Result};

/// Byte order of a binary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Cursor over an in-memory buffer with explicit endianness.
///
/// Every read checks bounds first and fails with
/// [`Error::UnexpectedEof`] carrying the offending offset; the cursor
/// advances only on success. There is no implicit backtracking; callers
/// reposition explicitly with [`BinaryReader::seek`].
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader over the whole buffer.
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self { data, pos: 0, endianness }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer is zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes remaining after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when the cursor has consumed the whole buffer.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Switch byte order mid-stream (PLY declares it in its header).
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Move the cursor to an absolute offset.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::UnexpectedEof(pos as u64));
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor without interpreting the bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Borrow `count` bytes and advance.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .ok_or(Error::UnexpectedEof(u64::MAX))?;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof(end as u64));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read an unsigned 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_u16(b),
            Endianness::Big => BigEndian::read_u16(b),
        })
    }

    /// Read an unsigned 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_u32(b),
            Endianness::Big => BigEndian::read_u32(b),
        })
    }

    /// Read a signed 32-bit value.
    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_i32(b),
            Endianness::Big => BigEndian::read_i32(b),
        })
    }

    /// Read a 32-bit float.
    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_f32(b),
            Endianness::Big => BigEndian::read_f32(b),
        })
    }

    /// Read a 64-bit float.
    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        Ok(match self.endianness {
            Endianness::Little => LittleEndian::read_f64(b),
            Endianness::Big => BigEndian::read_f64(b),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00];
        let mut r = BinaryReader::new(&data, Endianness::Little);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert_eq!(r.read_u16().unwrap(), 2);
        assert!(r.at_end());
    }

    #[test]
    fn test_endianness() {
        let data = [0x00, 0x00, 0x00, 0x01];
        let mut r = BinaryReader::new(&data, Endianness::Big);
        assert_eq!(r.read_u32().unwrap(), 1);

        let mut r = BinaryReader::new(&data, Endianness::Little);
        assert_eq!(r.read_u32().unwrap(), 0x0100_0000);
    }

    #[test]
    fn test_eof_does_not_advance() {
        let data = [0x01, 0x02];
        let mut r = BinaryReader::new(&data, Endianness::Little);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(4)));
        // Cursor unchanged, shorter read still works
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn test_seek_and_skip() {
        let data = [0u8; 10];
        let mut r = BinaryReader::new(&data, Endianness::Little);
        r.skip(4).unwrap();
        assert_eq!(r.position(), 4);
        r.seek(8).unwrap();
        assert_eq!(r.remaining(), 2);
        assert!(r.seek(11).is_err());
    }
}
