//! Binary framing primitives for the asset cache
//!
//! Integers are 4-byte little-endian. Strings carry a 7-bit-group varint byte
//! length followed by UTF-8. Forward references are written as placeholders and
//! backpatched once their value is known.

use crate::error::{AssetsError, AssetsResult};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

/// Sentinel written into a placeholder slot until it is resolved
pub const PLACEHOLDER_SENTINEL: i32 = i32::MIN;

/// Longest varint length prefix accepted for a u32 length
const MAX_LENGTH_PREFIX_BYTES: usize = 5;

/// A reserved i32 slot awaiting its final value.
///
/// Not `Clone`: a placeholder is consumed by [`FramedWriter::resolve`], so it
/// can be resolved at most once.
#[must_use = "placeholders must be resolved before the cache is finished"]
#[derive(Debug, PartialEq, Eq)]
pub struct Placeholder {
    offset: u64,
}

impl Placeholder {
    /// Byte offset of the reserved slot
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Writer half of the framing layer
pub struct FramedWriter<W: Write + Seek> {
    inner: W,
    outstanding: usize,
}

impl<W: Write + Seek> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            outstanding: 0,
        }
    }

    /// Current append position
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Write raw bytes with no length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| {
            io::Error::new(ErrorKind::InvalidInput, "string too long for cache format")
        })?;
        let (prefix, used) = length_prefix(len);
        self.inner.write_all(&prefix[..used])?;
        self.inner.write_all(value.as_bytes())
    }

    /// Reserve an i32 slot at the current position
    pub fn write_placeholder(&mut self) -> io::Result<Placeholder> {
        let offset = self.position()?;
        self.write_i32(PLACEHOLDER_SENTINEL)?;
        self.outstanding += 1;
        Ok(Placeholder { offset })
    }

    /// Backpatch a placeholder and return to the append position
    pub fn resolve(&mut self, placeholder: Placeholder, value: i32) -> io::Result<()> {
        let saved = self.position()?;
        self.inner.seek(SeekFrom::Start(placeholder.offset))?;
        self.write_i32(value)?;
        self.inner.seek(SeekFrom::Start(saved))?;
        self.outstanding -= 1;
        Ok(())
    }

    /// Number of placeholders issued but not yet resolved
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Flush and hand back the underlying stream.
    ///
    /// Fails if any placeholder was left unresolved.
    pub fn finish(mut self) -> AssetsResult<W> {
        if self.outstanding != 0 {
            return Err(AssetsError::UnresolvedPlaceholders(self.outstanding));
        }
        self.inner
            .flush()
            .map_err(|e| AssetsError::io("flushing asset cache", e))?;
        Ok(self.inner)
    }
}

/// Encode a string byte length as a 7-bit-group varint, low groups first
pub(crate) fn length_prefix(mut len: u32) -> ([u8; MAX_LENGTH_PREFIX_BYTES], usize) {
    let mut buf = [0u8; MAX_LENGTH_PREFIX_BYTES];
    let mut used = 0;
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            buf[used] = byte;
            used += 1;
            return (buf, used);
        }
        buf[used] = byte | 0x80;
        used += 1;
    }
}

/// Reader half of the framing layer.
///
/// Every read is bounds-checked against the stream length; anything that
/// would run past the end or decode to garbage is reported as
/// [`AssetsError::CacheInvalid`].
pub struct FramedReader<R: Read + Seek> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> FramedReader<R> {
    pub fn new(mut inner: R) -> AssetsResult<Self> {
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| AssetsError::io("measuring asset cache", e))?;
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| AssetsError::io("rewinding asset cache", e))?;
        Ok(Self { inner, len })
    }

    /// Total stream length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&mut self) -> AssetsResult<u64> {
        self.inner
            .stream_position()
            .map_err(|e| AssetsError::io("reading asset cache position", e))
    }

    /// Move to an absolute offset, which must lie within the stream
    pub fn seek_to(&mut self, offset: u64) -> AssetsResult<()> {
        if offset > self.len {
            return Err(AssetsError::invalid(format!(
                "offset {} is past end of cache ({} bytes)",
                offset, self.len
            )));
        }
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| AssetsError::io("seeking in asset cache", e))?;
        Ok(())
    }

    pub fn read_i32(&mut self) -> AssetsResult<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read an i32 that must be a non-negative count or index
    pub fn read_count(&mut self, what: &str) -> AssetsResult<usize> {
        let value = self.read_i32()?;
        usize::try_from(value)
            .map_err(|_| AssetsError::invalid(format!("negative {}: {}", what, value)))
    }

    pub fn read_bytes(&mut self, len: usize) -> AssetsResult<Vec<u8>> {
        self.ensure_remaining(len as u64)?;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read `expected.len()` raw bytes and compare them to `expected`
    pub fn bytes_equal(&mut self, expected: &[u8]) -> AssetsResult<bool> {
        let actual = self.read_bytes(expected.len())?;
        Ok(actual.as_slice() == expected)
    }

    pub fn read_string(&mut self) -> AssetsResult<String> {
        let len = self.read_length_prefix()?;
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes)
            .map_err(|_| AssetsError::invalid("string is not valid UTF-8"))
    }

    fn read_length_prefix(&mut self) -> AssetsResult<u32> {
        let mut value: u32 = 0;
        for i in 0..MAX_LENGTH_PREFIX_BYTES {
            let mut byte = [0u8; 1];
            self.read_exact(&mut byte)?;
            let low = u32::from(byte[0] & 0x7f);
            if i == MAX_LENGTH_PREFIX_BYTES - 1 && low > 0x0f {
                break;
            }
            value |= low << (7 * i);
            if byte[0] & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(AssetsError::invalid("malformed string length prefix"))
    }

    fn ensure_remaining(&mut self, needed: u64) -> AssetsResult<()> {
        let position = self.position()?;
        let remaining = self.len.saturating_sub(position);
        if needed > remaining {
            return Err(AssetsError::invalid(format!(
                "need {} bytes at offset {} but only {} remain",
                needed, position, remaining
            )));
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> AssetsResult<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                AssetsError::invalid("unexpected end of cache")
            } else {
                AssetsError::io("reading asset cache", e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer() -> FramedWriter<Cursor<Vec<u8>>> {
        FramedWriter::new(Cursor::new(Vec::new()))
    }

    fn reader(bytes: Vec<u8>) -> FramedReader<Cursor<Vec<u8>>> {
        FramedReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn placeholder_is_backpatched() {
        let mut w = writer();
        w.write_i32(7).unwrap();
        let slot = w.write_placeholder().unwrap();
        assert_eq!(slot.offset(), 4);
        w.write_string("tail").unwrap();
        assert_eq!(w.outstanding(), 1);

        w.resolve(slot, 42).unwrap();
        assert_eq!(w.outstanding(), 0);
        // Appending continues after the backpatch
        w.write_i32(9).unwrap();

        let bytes = w.finish().unwrap().into_inner();
        let mut r = reader(bytes);
        assert_eq!(r.read_i32().unwrap(), 7);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert_eq!(r.read_string().unwrap(), "tail");
        assert_eq!(r.read_i32().unwrap(), 9);
    }

    #[test]
    fn unresolved_placeholder_fails_finish() {
        let mut w = writer();
        let _slot = w.write_placeholder().unwrap();
        let err = w.finish().unwrap_err();
        assert!(matches!(err, AssetsError::UnresolvedPlaceholders(1)));
    }

    #[test]
    fn sentinel_is_written_until_resolved() {
        let mut w = writer();
        let slot = w.write_placeholder().unwrap();
        let snapshot = w.inner.get_ref().clone();
        assert_eq!(snapshot, PLACEHOLDER_SENTINEL.to_le_bytes());
        w.resolve(slot, 1).unwrap();
    }

    #[test]
    fn long_string_uses_multibyte_prefix() {
        let long = "x".repeat(300);
        let mut w = writer();
        w.write_string(&long).unwrap();
        let bytes = w.finish().unwrap().into_inner();
        // 300 = 0b10_0101100 -> 0xAC 0x02
        assert_eq!(&bytes[..2], &[0xac, 0x02]);
        assert_eq!(bytes.len(), 302);
        assert_eq!(reader(bytes).read_string().unwrap(), long);
    }

    #[test]
    fn non_ascii_string_length_is_in_bytes() {
        let mut w = writer();
        w.write_string("Grüße").unwrap();
        let bytes = w.finish().unwrap().into_inner();
        assert_eq!(bytes[0], 7);
        assert_eq!(reader(bytes).read_string().unwrap(), "Grüße");
    }

    #[test]
    fn truncated_string_is_invalid() {
        let mut w = writer();
        w.write_string("hello world").unwrap();
        let mut bytes = w.finish().unwrap().into_inner();
        bytes.truncate(5);
        let err = reader(bytes).read_string().unwrap_err();
        assert!(matches!(err, AssetsError::CacheInvalid { .. }));
    }

    #[test]
    fn truncated_int_is_invalid() {
        let err = reader(vec![1, 2]).read_i32().unwrap_err();
        assert!(matches!(err, AssetsError::CacheInvalid { .. }));
    }

    #[test]
    fn overlong_length_prefix_is_invalid() {
        let err = reader(vec![0xff; 8]).read_string().unwrap_err();
        assert!(matches!(err, AssetsError::CacheInvalid { .. }));
    }

    #[test]
    fn invalid_utf8_is_invalid() {
        let err = reader(vec![2, 0xc3, 0x28]).read_string().unwrap_err();
        assert!(matches!(err, AssetsError::CacheInvalid { .. }));
    }

    #[test]
    fn negative_count_is_invalid() {
        let bytes = (-3i32).to_le_bytes().to_vec();
        let err = reader(bytes).read_count("item count").unwrap_err();
        assert!(err.to_string().contains("negative item count"));
    }

    #[test]
    fn seek_past_end_is_invalid() {
        let mut r = reader(vec![0; 4]);
        assert!(r.seek_to(4).is_ok());
        assert!(matches!(
            r.seek_to(5).unwrap_err(),
            AssetsError::CacheInvalid { .. }
        ));
    }

    #[test]
    fn bytes_equal_compares() {
        let mut r = reader(vec![1, 2, 3, 4]);
        assert!(r.bytes_equal(&[1, 2]).unwrap());
        assert!(!r.bytes_equal(&[9, 9]).unwrap());
    }
}
