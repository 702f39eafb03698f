//! Bit-level read view over a compressed frame.
//!
//! ALAC frames are big-endian bitstreams. The reader wraps
//! [`bitstream_io::BitReader`] with the length of the underlying span so every
//! read is bounded by the frame, and adds the unary prefix read used by the
//! adaptive Golomb decoder.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader, SignedInteger, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

fn out_of_bounds(op: &str, n: u32, position: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("{op}({n}): out of bounds bits at {position}"),
    )
}

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // Only call position() on error path to avoid overhead
                Err(out_of_bounds(
                    "get_n",
                    n,
                    self.bs.position_in_bits().unwrap_or(0),
                ))
            }
            Err(e) => Err(e),
        }
    }

    #[inline(always)]
    pub fn get_s<S: SignedInteger>(&mut self, n: u32) -> io::Result<S> {
        match self.bs.read_signed_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(out_of_bounds(
                "get_s",
                n,
                self.bs.position_in_bits().unwrap_or(0),
            )),
            Err(e) => Err(e),
        }
    }

    /// Reads a field whose width is only known at run time; zero bits read as 0.
    #[inline(always)]
    pub fn get_bits(&mut self, n: u32) -> io::Result<u32> {
        if n == 0 {
            return Ok(0);
        }

        self.get_n(n)
    }

    /// Counts consecutive one bits, consuming the terminating zero.
    ///
    /// At most `max` ones are read; when the limit is reached the bit that
    /// follows is left in the stream.
    #[inline(always)]
    pub fn get_unary(&mut self, max: u32) -> io::Result<u32> {
        let mut ones = 0;

        while ones < max {
            if !self.get()? {
                break;
            }
            ones += 1;
        }

        Ok(ones)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        }

        if n as u64 > self.available()? {
            return Err(out_of_bounds("skip_n", n, self.position()?));
        }

        self.bs.skip(n)
    }

    #[inline(always)]
    pub fn byte_align(&mut self) {
        self.bs.byte_align();
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs
            .position_in_bits()
            .map(|pos| self.len.saturating_sub(pos))
    }

    #[inline(always)]
    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}


#[cfg(test)]
mod tests {
    use super::test_bits::BitBuilder;
    use super::*;

    #[test]
    fn test_bounded_view() {
        let data = [0xAB, 0xCD, 0xEF];

        let mut reader = BsIoSliceReader::from_slice(&data[..2]);
        assert_eq!(reader.available().unwrap(), 16);
        assert_eq!(reader.get_n::<u16>(16).unwrap(), 0xABCD);
        assert_eq!(reader.available().unwrap(), 0);
        assert!(reader.get().is_err());
    }

    #[test]
    fn test_unary_prefix() {
        // 1110 1111 1111 1...
        let data = [0b1110_1111, 0b1111_1000];
        let mut reader = BsIoSliceReader::from_slice(&data);

        assert_eq!(reader.get_unary(9).unwrap(), 3);
        assert_eq!(reader.position().unwrap(), 4);

        // Nine ones stop the count without consuming the tenth bit.
        assert_eq!(reader.get_unary(9).unwrap(), 9);
        assert_eq!(reader.position().unwrap(), 13);
        assert!(!reader.get().unwrap());
    }

    #[test]
    fn test_signed_and_skip() {
        let data = [0xFF, 0xFE, 0x80];
        let mut reader = BsIoSliceReader::from_slice(&data);

        assert_eq!(reader.get_s::<i16>(16).unwrap(), -2);
        assert_eq!(reader.get_bits(0).unwrap(), 0);
        reader.skip_n(1).unwrap();
        assert!(reader.skip_n(8).is_err());
        reader.byte_align();
        assert_eq!(reader.available().unwrap(), 0);
    }

    #[test]
    fn test_builder_layout() {
        let data = BitBuilder::new()
            .put(3, 0b101)
            .put_str("1 1")
            .put(16, 0xBEEF)
            .finish();
        assert_eq!(data, [0b1011_1101, 0xF7, 0x78]);
    }
}
