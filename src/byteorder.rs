pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

pub trait WriteBytesBe {
    fn write_be(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le_be {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
        impl WriteBytesBe for $t { #[inline] fn write_be(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_be_bytes()); }}
    )+ }
}

impl_num_le_be!(u8, u16, u32, u64, f64);

// GUIDs and four-character codes are written as-is in either byte order.
impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

impl<T: WriteBytesBe, const N: usize> WriteBytesBe for [T; N] {
    #[inline]
    fn write_be(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_be(dst));
    }
}

#[cfg(test)]
mod tests {
    use crate::byteorder::{WriteBytesBe, WriteBytesLe};
    use alacd_macros::ToBytes;

    #[derive(ToBytes)]
    struct Mini {
        a: u16,
        b: u32,
        tag: [u8; 4],
    }

    #[derive(ToBytes)]
    struct Rate(f64);

    #[test]
    fn test_derived_byte_order() {
        let s = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            tag: *b"alac",
        };

        let mut le = Vec::new();
        let mut be = Vec::new();
        s.write_le(&mut le);
        s.write_be(&mut be);

        assert_eq!(le, [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'a', b'l', b'a', b'c']);
        assert_eq!(be, [0x12, 0x34, 0xAB, 0xCD, 0xEF, 0x01, b'a', b'l', b'a', b'c']);
    }

    #[test]
    fn test_tuple_struct() {
        let mut be = Vec::new();
        Rate(44100.0).write_be(&mut be);
        assert_eq!(be, 44100.0f64.to_be_bytes());
    }
}
