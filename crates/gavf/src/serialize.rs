//! Wire serialization of values and dictionaries.
//!
//! A value travels as `[u8 type tag][payload]`; a dictionary as
//! `[u32v entry count]` followed by `[string name][value]` per entry.
//! Integers are zigzag varints, floats IEEE-754 big-endian, strings and
//! binaries length-prefixed. Audio and video formats go as their nested
//! dictionary form — the in-memory record is not the on-disk shape.

use gavf_io::IoStream;
use gavf_value::{Array, AudioFormat, Dictionary, Value, ValueType, VideoFormat};

use crate::{Error, Result};

pub fn write_value(io: &mut IoStream, v: &Value) -> Result<()> {
    io.write_u8(v.value_type().tag())?;
    match v {
        Value::Undefined => {}
        Value::Int(i) => io.write_i32v(*i)?,
        Value::Long(l) => io.write_i64v(*l)?,
        Value::Float(f) => io.write_f64(*f)?,
        Value::String(s) => io.write_string(s)?,
        Value::AudioFormat(f) => write_dictionary(io, &f.to_dictionary())?,
        Value::VideoFormat(f) => write_dictionary(io, &f.to_dictionary())?,
        Value::ColorRgb(c) => {
            for x in c {
                io.write_f64(*x)?;
            }
        }
        Value::ColorRgba(c) => {
            for x in c {
                io.write_f64(*x)?;
            }
        }
        Value::Position(p) => {
            for x in p {
                io.write_f64(*x)?;
            }
        }
        Value::Dictionary(d) => write_dictionary(io, d)?,
        Value::Array(a) => {
            io.write_u32v(a.len() as u32)?;
            for item in a {
                write_value(io, item)?;
            }
        }
        Value::Binary(b) => io.write_buffer(b)?,
    }
    Ok(())
}

pub fn read_value(io: &mut IoStream) -> Result<Value> {
    let tag = io.read_u8()?;
    let value_type =
        ValueType::from_tag(tag).ok_or_else(|| Error::Parse(format!("unknown type tag {tag}")))?;
    Ok(match value_type {
        ValueType::Undefined => Value::Undefined,
        ValueType::Int => Value::Int(io.read_i32v()?),
        ValueType::Long => Value::Long(io.read_i64v()?),
        ValueType::Float => Value::Float(io.read_f64()?),
        ValueType::String => Value::String(io.read_string()?),
        ValueType::AudioFormat => {
            let dict = read_dictionary(io)?;
            let fmt = AudioFormat::from_dictionary(&dict)
                .ok_or_else(|| Error::Parse("invalid audio format".into()))?;
            Value::from(fmt)
        }
        ValueType::VideoFormat => {
            let dict = read_dictionary(io)?;
            let fmt = VideoFormat::from_dictionary(&dict)
                .ok_or_else(|| Error::Parse("invalid video format".into()))?;
            Value::from(fmt)
        }
        ValueType::ColorRgb => {
            let mut c = [0.0; 3];
            for x in &mut c {
                *x = io.read_f64()?;
            }
            Value::ColorRgb(c)
        }
        ValueType::ColorRgba => {
            let mut c = [0.0; 4];
            for x in &mut c {
                *x = io.read_f64()?;
            }
            Value::ColorRgba(c)
        }
        ValueType::Position => {
            let mut p = [0.0; 2];
            for x in &mut p {
                *x = io.read_f64()?;
            }
            Value::Position(p)
        }
        ValueType::Dictionary => Value::Dictionary(read_dictionary(io)?),
        ValueType::Array => {
            let count = io.read_u32v()? as usize;
            let mut arr = Array::new();
            for _ in 0..count {
                arr.push(read_value(io)?);
            }
            Value::Array(arr)
        }
        ValueType::Binary => Value::Binary(io.read_buffer()?),
    })
}

pub fn write_dictionary(io: &mut IoStream, dict: &Dictionary) -> Result<()> {
    io.write_u32v(dict.len() as u32)?;
    for (name, val) in dict {
        io.write_string(name)?;
        write_value(io, val)?;
    }
    Ok(())
}

pub fn read_dictionary(io: &mut IoStream) -> Result<Dictionary> {
    let count = io.read_u32v()? as usize;
    let mut dict = Dictionary::new();
    for _ in 0..count {
        let name = io.read_string()?;
        let val = read_value(io)?;
        dict.set(&name, val);
    }
    Ok(dict)
}

/// Serialize a dictionary into a byte vector.
pub fn dictionary_to_buffer(dict: &Dictionary) -> Result<Vec<u8>> {
    let mut io = gavf_io::mem::write();
    write_dictionary(&mut io, dict)?;
    io.take_buffer()
        .map(gavf_value::Buffer::into_vec)
        .ok_or_else(|| Error::Parse("memory sink lost its buffer".into()))
}

/// Parse a dictionary from a byte slice. Trailing bytes are an error.
pub fn dictionary_from_buffer(data: &[u8]) -> Result<Dictionary> {
    let total = data.len() as i64;
    let mut io = gavf_io::mem::read(data.to_vec());
    let dict = read_dictionary(&mut io)?;
    if io.position() != total {
        return Err(Error::Parse("trailing bytes after dictionary".into()));
    }
    Ok(dict)
}
