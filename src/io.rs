//! Abstract stream handed to plugins.
//!
//! Plugins never see a concrete file. They get a [`ImageIo`], which may be
//! backed by memory ([`MemoryIo`]) or, with `std`, by any
//! `Read + Write + Seek` ([`StreamIo`]).

use alloc::vec::Vec;

use crate::error::ImageError;

/// Seek origin, mirroring `std::io::SeekFrom` for no_std builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

/// Byte stream with random access.
///
/// `read` and `write` report how many bytes were transferred. A short count
/// means end of stream or a failed transfer; neither is an error at this level.
pub trait ImageIo {
    fn read(&mut self, buf: &mut [u8]) -> usize;
    fn write(&mut self, buf: &[u8]) -> usize;
    /// Move the cursor and return the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError>;
    fn tell(&mut self) -> Result<u64, ImageError>;

    /// Read up to `count` elements of `size` bytes each into `buf`.
    ///
    /// Returns the number of whole elements read. A trailing partial element
    /// is consumed from the stream but not counted.
    fn read_elements(&mut self, buf: &mut [u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let wanted = size.saturating_mul(count).min(buf.len());
        let mut filled = 0;
        while filled < wanted {
            let n = self.read(&mut buf[filled..wanted]);
            if n == 0 {
                break;
            }
            filled += n;
        }
        filled / size
    }

    /// Fill `buf` completely or fail with [`ImageError::UnexpectedEof`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ImageError> {
        if self.read_elements(buf, 1, buf.len()) == buf.len() {
            Ok(())
        } else {
            Err(ImageError::UnexpectedEof)
        }
    }

    /// Write all of `buf` or fail.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), ImageError> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]);
            if n == 0 {
                return Err(ImageError::Io(alloc::format!(
                    "short write: {written} of {} bytes",
                    buf.len()
                )));
            }
            written += n;
        }
        Ok(())
    }
}

impl<T: ImageIo + ?Sized> ImageIo for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        (**self).write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError> {
        (**self).seek(pos)
    }

    fn tell(&mut self) -> Result<u64, ImageError> {
        (**self).tell()
    }
}

fn offset(base: u64, delta: i64) -> Result<u64, ImageError> {
    base.checked_add_signed(delta).ok_or_else(|| {
        ImageError::InvalidParameter(alloc::format!("seek to {base}{delta:+} is out of range"))
    })
}

/// Growable in-memory stream.
///
/// Writes past the end extend the buffer, zero-filling any gap left by a
/// previous seek.
#[derive(Clone, Debug, Default)]
pub struct MemoryIo {
    data: Vec<u8>,
    pos: u64,
}

impl MemoryIo {
    /// Empty stream, ready for writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream over existing bytes, positioned at the start.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ImageIo for MemoryIo {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let Ok(start) = usize::try_from(self.pos) else {
            return 0;
        };
        let Some(available) = self.data.get(start..) else {
            return 0;
        };
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let Ok(start) = usize::try_from(self.pos) else {
            return 0;
        };
        let Some(end) = start.checked_add(buf.len()) else {
            return 0;
        };
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        buf.len()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError> {
        self.pos = match pos {
            SeekFrom::Start(p) => p,
            SeekFrom::Current(d) => offset(self.pos, d)?,
            SeekFrom::End(d) => offset(self.data.len() as u64, d)?,
        };
        Ok(self.pos)
    }

    fn tell(&mut self) -> Result<u64, ImageError> {
        Ok(self.pos)
    }
}

/// Adapter from any `std::io` stream.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StreamIo<T> {
    inner: T,
}

#[cfg(feature = "std")]
impl<T> StreamIo<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Write + std::io::Seek> ImageIo for StreamIo<T> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::trace!(error = %e, "stream read failed");
                    return 0;
                }
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        loop {
            match self.inner.write(buf) {
                Ok(n) => return n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::trace!(error = %e, "stream write failed");
                    return 0;
                }
            }
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError> {
        let pos = match pos {
            SeekFrom::Start(p) => std::io::SeekFrom::Start(p),
            SeekFrom::Current(d) => std::io::SeekFrom::Current(d),
            SeekFrom::End(d) => std::io::SeekFrom::End(d),
        };
        Ok(self.inner.seek(pos)?)
    }

    fn tell(&mut self) -> Result<u64, ImageError> {
        Ok(self.inner.stream_position()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_and_seek() {
        let mut io = MemoryIo::from_bytes(alloc::vec![1u8, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];
        assert_eq!(io.read(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(io.tell().unwrap(), 2);
        assert_eq!(io.seek(SeekFrom::End(-1)).unwrap(), 4);
        assert_eq!(io.read(&mut buf), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(io.read(&mut buf), 0);
        assert!(io.seek(SeekFrom::Current(-10)).is_err());
    }

    #[test]
    fn read_elements_counts_whole_elements() {
        let mut io = MemoryIo::from_bytes(alloc::vec![0u8; 7]);
        let mut buf = [0u8; 8];
        assert_eq!(io.read_elements(&mut buf, 2, 4), 3);
        assert_eq!(io.tell().unwrap(), 7);
        assert_eq!(io.read_elements(&mut buf, 0, 4), 0);
    }

    #[test]
    fn writes_extend_and_zero_fill() {
        let mut io = MemoryIo::new();
        io.write_all(b"ab").unwrap();
        io.seek(SeekFrom::Start(4)).unwrap();
        io.write_all(b"c").unwrap();
        assert_eq!(io.as_bytes(), b"ab\0\0c");
        io.seek(SeekFrom::Start(1)).unwrap();
        io.write_all(b"X").unwrap();
        assert_eq!(io.into_inner(), b"aX\0\0c");
    }

    #[test]
    fn read_exact_reports_eof() {
        let mut io = MemoryIo::from_bytes(alloc::vec![9u8; 3]);
        let mut buf = [0u8; 4];
        assert!(matches!(io.read_exact(&mut buf), Err(ImageError::UnexpectedEof)));
    }

    #[cfg(feature = "std")]
    #[test]
    fn stream_adapter() {
        let mut io = StreamIo::new(std::io::Cursor::new(alloc::vec![1u8, 2, 3]));
        let mut buf = [0u8; 3];
        io.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(io.tell().unwrap(), 3);
        io.seek(SeekFrom::Start(0)).unwrap();
        io.write_all(&[7]).unwrap();
        assert_eq!(io.into_inner().into_inner(), alloc::vec![7, 2, 3]);
    }
}
