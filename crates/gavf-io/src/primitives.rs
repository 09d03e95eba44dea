//! Wire primitives: fixed-width integers, variable-length integers,
//! floats, length-prefixed strings and buffers.
//!
//! Variable-length unsigned integers are emitted 7 bits per byte,
//! little-endian group order, with the high bit set on all bytes but the
//! last. Signed variants are zigzag-mapped onto the unsigned coding.
//! Floats travel as IEEE-754 in big-endian byte order. Fixed-width
//! integers are two's complement in the endianness of the call site.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use gavf_value::Buffer;

use crate::{Error, IoStream, Result};

/// Zigzag-encode a signed value.
fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Invert the zigzag coding.
fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

impl IoStream {
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn write_u8(&mut self, val: u8) -> Result<()> {
        self.write_data(&[val])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(LittleEndian::read_u16(&b))
    }

    pub fn write_u16_le(&mut self, val: u16) -> Result<()> {
        self.write_data(&val.to_le_bytes())
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(BigEndian::read_u16(&b))
    }

    pub fn write_u16_be(&mut self, val: u16) -> Result<()> {
        self.write_data(&val.to_be_bytes())
    }

    pub fn read_u24_le(&mut self) -> Result<u32> {
        let mut b = [0u8; 3];
        self.read_exact(&mut b)?;
        Ok(LittleEndian::read_u24(&b))
    }

    pub fn write_u24_le(&mut self, val: u32) -> Result<()> {
        self.write_data(&val.to_le_bytes()[..3])
    }

    pub fn read_u24_be(&mut self) -> Result<u32> {
        let mut b = [0u8; 3];
        self.read_exact(&mut b)?;
        Ok(BigEndian::read_u24(&b))
    }

    pub fn write_u24_be(&mut self, val: u32) -> Result<()> {
        self.write_data(&val.to_be_bytes()[1..])
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(LittleEndian::read_u32(&b))
    }

    pub fn write_u32_le(&mut self, val: u32) -> Result<()> {
        self.write_data(&val.to_le_bytes())
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(BigEndian::read_u32(&b))
    }

    pub fn write_u32_be(&mut self, val: u32) -> Result<()> {
        self.write_data(&val.to_be_bytes())
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(LittleEndian::read_u64(&b))
    }

    pub fn write_u64_le(&mut self, val: u64) -> Result<()> {
        self.write_data(&val.to_le_bytes())
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(BigEndian::read_u64(&b))
    }

    pub fn write_u64_be(&mut self, val: u64) -> Result<()> {
        self.write_data(&val.to_be_bytes())
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.read_u64_le()? as i64)
    }

    pub fn write_i64_le(&mut self, val: i64) -> Result<()> {
        self.write_u64_le(val as u64)
    }

    /* Variable-length integers */

    pub fn write_u64v(&mut self, mut num: u64) -> Result<()> {
        let mut out = [0u8; 10];
        let mut len = 0;
        loop {
            let mut byte = (num & 0x7f) as u8;
            num >>= 7;
            if num != 0 {
                byte |= 0x80;
            }
            out[len] = byte;
            len += 1;
            if num == 0 {
                break;
            }
        }
        self.write_data(&out[..len])
    }

    pub fn read_u64v(&mut self) -> Result<u64> {
        let mut num: u64 = 0;
        for i in 0..10 {
            let byte = self.read_u8()?;
            num |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(num);
            }
        }
        Err(Error::VarintOverflow)
    }

    pub fn write_u32v(&mut self, num: u32) -> Result<()> {
        self.write_u64v(u64::from(num))
    }

    pub fn read_u32v(&mut self) -> Result<u32> {
        let num = self.read_u64v()?;
        u32::try_from(num).map_err(|_| Error::VarintOverflow)
    }

    pub fn write_i64v(&mut self, num: i64) -> Result<()> {
        self.write_u64v(zigzag(num))
    }

    pub fn read_i64v(&mut self) -> Result<i64> {
        Ok(unzigzag(self.read_u64v()?))
    }

    pub fn write_i32v(&mut self, num: i32) -> Result<()> {
        self.write_i64v(i64::from(num))
    }

    pub fn read_i32v(&mut self) -> Result<i32> {
        let num = self.read_i64v()?;
        i32::try_from(num).map_err(|_| Error::VarintOverflow)
    }

    /* Floats, IEEE-754 big-endian */

    pub fn write_f32(&mut self, num: f32) -> Result<()> {
        self.write_data(&num.to_bits().to_be_bytes())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32_be()?))
    }

    pub fn write_f64(&mut self, num: f64) -> Result<()> {
        self.write_data(&num.to_bits().to_be_bytes())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64_be()?))
    }

    /* Length-prefixed strings and buffers */

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_u32v(s.len() as u32)?;
        self.write_data(s.as_bytes())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32v()? as usize;
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| Error::Parse(format!("invalid utf-8 string: {e}")))
    }

    pub fn write_buffer(&mut self, buf: &Buffer) -> Result<()> {
        self.write_u32v(buf.len() as u32)?;
        self.write_data(buf.as_slice())
    }

    pub fn read_buffer(&mut self) -> Result<Buffer> {
        let len = self.read_u32v()? as usize;
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        Ok(Buffer::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem;

    fn round_trip<T, W, R>(vals: &[T], write: W, read: R)
    where
        T: Copy + PartialEq + std::fmt::Debug,
        W: Fn(&mut IoStream, T) -> Result<()>,
        R: Fn(&mut IoStream) -> Result<T>,
    {
        let mut io = mem::write();
        for v in vals {
            write(&mut io, *v).unwrap();
        }
        let buf = io.take_buffer().unwrap();
        let mut io = mem::read(buf.into_vec());
        for v in vals {
            assert_eq!(read(&mut io).unwrap(), *v);
        }
    }

    #[test]
    fn unsigned_varint_round_trip() {
        round_trip(
            &[0u64, 1, 127, 128, 16383, 16384, u64::MAX],
            IoStream::write_u64v,
            |io| io.read_u64v(),
        );
    }

    #[test]
    fn signed_varint_round_trip() {
        round_trip(
            &[i64::MIN, -1, 0, 1, i64::MAX, -300, 300],
            IoStream::write_i64v,
            |io| io.read_i64v(),
        );
    }

    #[test]
    fn varint_encoding_is_compact() {
        let mut io = mem::write();
        io.write_u64v(127).unwrap();
        io.write_u64v(128).unwrap();
        let buf = io.take_buffer().unwrap();
        assert_eq!(buf.as_slice(), &[0x7f, 0x80, 0x01]);
    }

    #[test]
    fn fixed_width_round_trips() {
        round_trip(&[0u16, 0xbeef], IoStream::write_u16_le, |io| {
            io.read_u16_le()
        });
        round_trip(&[0u32, 0xdead_beef], IoStream::write_u32_be, |io| {
            io.read_u32_be()
        });
        round_trip(&[0u32, 0xabcdef], IoStream::write_u24_be, |io| {
            io.read_u24_be()
        });
        round_trip(&[0u64, u64::MAX], IoStream::write_u64_le, |io| {
            io.read_u64_le()
        });
        round_trip(&[i64::MIN, -1, i64::MAX], IoStream::write_i64_le, |io| {
            io.read_i64_le()
        });
    }

    #[test]
    fn float_round_trips() {
        round_trip(
            &[0.0f64, -1.5, std::f64::consts::PI],
            IoStream::write_f64,
            |io| io.read_f64(),
        );
        round_trip(&[0.0f32, 2.5], IoStream::write_f32, |io| io.read_f32());
    }

    #[test]
    fn string_round_trip() {
        let mut io = mem::write();
        io.write_string("hällo wörld").unwrap();
        io.write_string("").unwrap();
        let buf = io.take_buffer().unwrap();
        let mut io = mem::read(buf.into_vec());
        assert_eq!(io.read_string().unwrap(), "hällo wörld");
        assert_eq!(io.read_string().unwrap(), "");
    }

    #[test]
    fn buffer_round_trip() {
        let mut io = mem::write();
        io.write_buffer(&Buffer::from_slice(&[1, 2, 3])).unwrap();
        let buf = io.take_buffer().unwrap();
        let mut io = mem::read(buf.into_vec());
        assert_eq!(io.read_buffer().unwrap().as_slice(), &[1, 2, 3]);
    }
}
