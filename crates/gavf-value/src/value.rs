//! The tagged value union.

use std::fmt;

use crate::{Array, AudioFormat, Buffer, Dictionary, VideoFormat};

/// Type tag of a [`Value`].
///
/// The numeric discriminants are the on-wire type tags; the short names are
/// used in diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Undefined = 0,
    Int = 1,
    Long = 2,
    Float = 3,
    String = 4,
    AudioFormat = 5,
    VideoFormat = 6,
    ColorRgb = 7,
    ColorRgba = 8,
    Position = 9,
    Dictionary = 10,
    Array = 11,
    Binary = 12,
}

impl ValueType {
    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a type by wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Undefined,
            1 => Self::Int,
            2 => Self::Long,
            3 => Self::Float,
            4 => Self::String,
            5 => Self::AudioFormat,
            6 => Self::VideoFormat,
            7 => Self::ColorRgb,
            8 => Self::ColorRgba,
            9 => Self::Position,
            10 => Self::Dictionary,
            11 => Self::Array,
            12 => Self::Binary,
            _ => return None,
        })
    }

    /// Short name used in diagnostics (never on the wire).
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Int => "i",
            Self::Long => "l",
            Self::Float => "f",
            Self::String => "s",
            Self::AudioFormat => "af",
            Self::VideoFormat => "vf",
            Self::ColorRgb => "rgb",
            Self::ColorRgba => "rgba",
            Self::Position => "pos",
            Self::Dictionary => "d",
            Self::Array => "a",
            Self::Binary => "b",
        }
    }

    /// Look up a type by its short name.
    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "i" => Self::Int,
            "l" => Self::Long,
            "f" => Self::Float,
            "s" => Self::String,
            "af" => Self::AudioFormat,
            "vf" => Self::VideoFormat,
            "rgb" => Self::ColorRgb,
            "rgba" => Self::ColorRgba,
            "pos" => Self::Position,
            "d" => Self::Dictionary,
            "a" => Self::Array,
            "b" => Self::Binary,
            _ => return None,
        })
    }
}

/// Dynamic value: the lingua franca for track descriptions, metadata,
/// parameters and message arguments.
///
/// Composite variants exclusively own their contents. Copy is deep
/// ([`Clone`]), move is [`Value::take`], and assigning a new variant drops
/// the previous contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Int(i32),
    Long(i64),
    Float(f64),
    String(String),
    AudioFormat(Box<AudioFormat>),
    VideoFormat(Box<VideoFormat>),
    ColorRgb([f64; 3]),
    ColorRgba([f64; 4]),
    Position([f64; 2]),
    Dictionary(Dictionary),
    Array(Array),
    Binary(Buffer),
}

impl Value {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Undefined => ValueType::Undefined,
            Self::Int(_) => ValueType::Int,
            Self::Long(_) => ValueType::Long,
            Self::Float(_) => ValueType::Float,
            Self::String(_) => ValueType::String,
            Self::AudioFormat(_) => ValueType::AudioFormat,
            Self::VideoFormat(_) => ValueType::VideoFormat,
            Self::ColorRgb(_) => ValueType::ColorRgb,
            Self::ColorRgba(_) => ValueType::ColorRgba,
            Self::Position(_) => ValueType::Position,
            Self::Dictionary(_) => ValueType::Dictionary,
            Self::Array(_) => ValueType::Array,
            Self::Binary(_) => ValueType::Binary,
        }
    }

    /// True if the value is [`Value::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Free the contents and return to the undefined state.
    pub fn reset(&mut self) {
        *self = Self::Undefined;
    }

    /// Move the value out, leaving [`Value::Undefined`] behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Integer view with cross-type conversion.
    ///
    /// Longs and floats are truncated; strings must parse completely.
    pub fn get_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Long(v) => Some(*v as i32),
            Self::Float(v) => Some(*v as i32),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Long view with cross-type conversion.
    pub fn get_long(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view with cross-type conversion.
    pub fn get_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view. No coercion; see [`Value::to_string_coerced`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Self::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Buffer> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_binary_mut(&mut self) -> Option<&mut Buffer> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_audio_format(&self) -> Option<&AudioFormat> {
        match self {
            Self::AudioFormat(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_audio_format_mut(&mut self) -> Option<&mut AudioFormat> {
        match self {
            Self::AudioFormat(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_video_format(&self) -> Option<&VideoFormat> {
        match self {
            Self::VideoFormat(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_video_format_mut(&mut self) -> Option<&mut VideoFormat> {
        match self {
            Self::VideoFormat(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_color_rgb(&self) -> Option<&[f64; 3]> {
        match self {
            Self::ColorRgb(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_color_rgba(&self) -> Option<&[f64; 4]> {
        match self {
            Self::ColorRgba(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<&[f64; 2]> {
        match self {
            Self::Position(p) => Some(p),
            _ => None,
        }
    }

    /// Number of items under the scalar-as-array convention.
    ///
    /// 0 for undefined, the array length for arrays, 1 otherwise.
    pub fn num_items(&self) -> usize {
        match self {
            Self::Undefined => 0,
            Self::Array(a) => a.len(),
            _ => 1,
        }
    }

    /// Item access under the scalar-as-array convention.
    ///
    /// Index 0 of a scalar is the scalar itself.
    pub fn get_item(&self, item: usize) -> Option<&Value> {
        match self {
            Self::Undefined => None,
            Self::Array(a) => a.get(item),
            _ if item == 0 => Some(self),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::get_item`].
    pub fn get_item_mut(&mut self, item: usize) -> Option<&mut Value> {
        match self {
            Self::Undefined => None,
            Self::Array(a) => a.get_mut(item),
            _ if item == 0 => Some(self),
            _ => None,
        }
    }

    /// Delete an item under the scalar-as-array convention.
    pub fn delete_item(&mut self, item: usize) {
        match self {
            Self::Undefined => {}
            Self::Array(a) => a.splice_val(item as isize, 1, None),
            _ if item == 0 => self.reset(),
            _ => {}
        }
    }

    /// Append a child, promoting to an array on the second append.
    ///
    /// An undefined value becomes the child itself; a scalar is wrapped
    /// into an array first; an array just grows.
    pub fn append(&mut self, child: Value) {
        match self {
            Self::Undefined => *self = child,
            Self::Array(a) => a.push(child),
            _ => {
                let first = self.take();
                let mut arr = Array::new();
                arr.push(first);
                arr.push(child);
                *self = Self::Array(arr);
            }
        }
    }

    /// Printable form of a scalar; `None` for composites.
    pub fn to_string_coerced(&self) -> Option<String> {
        match self {
            Self::Int(v) => Some(v.to_string()),
            Self::Long(v) => Some(v.to_string()),
            Self::Float(v) => Some(format!("{v:.16e}")),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Parse `str` into this value, honoring an existing type.
    ///
    /// Into an undefined value the string is sniffed: a complete integer
    /// parse wins, then a float parse, otherwise the string is stored
    /// verbatim. Into a typed scalar the string is coerced to that type.
    pub fn from_string(&mut self, s: &str) {
        match self {
            Self::Undefined => {
                if let Ok(l) = s.parse::<i64>() {
                    *self = Self::Long(l);
                } else if let Ok(f) = s.parse::<f64>() {
                    *self = Self::Float(f);
                } else {
                    *self = Self::String(s.to_owned());
                }
            }
            Self::Int(v) => *v = s.trim().parse().unwrap_or(0),
            Self::Long(v) => *v = s.trim().parse().unwrap_or(0),
            Self::Float(v) => *v = s.trim().parse().unwrap_or(0.0),
            Self::String(v) => *v = s.to_owned(),
            _ => {}
        }
    }

    /// Multi-line debug dump at the given indent depth.
    pub fn dump(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        match self {
            Self::Undefined => "undefined".to_owned(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => format!("{v}"),
            Self::String(s) => format!("\"{s}\""),
            Self::AudioFormat(f) => format!("audio format [{} Hz, {} ch]", f.samplerate, f.num_channels),
            Self::VideoFormat(f) => format!("video format [{}x{}]", f.image_width, f.image_height),
            Self::ColorRgb(c) => format!("rgb({}, {}, {})", c[0], c[1], c[2]),
            Self::ColorRgba(c) => format!("rgba({}, {}, {}, {})", c[0], c[1], c[2], c[3]),
            Self::Position(p) => format!("pos({}, {})", p[0], p[1]),
            Self::Dictionary(d) => d.dump(indent),
            Self::Array(a) => {
                let mut out = String::from("[\n");
                for v in a.iter() {
                    out.push_str(&format!("{pad}  {}\n", v.dump(indent + 2)));
                }
                out.push_str(&format!("{pad}]"));
                out
            }
            Self::Binary(b) => format!("<{} bytes binary>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump(0))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Dictionary> for Value {
    fn from(v: Dictionary) -> Self {
        Self::Dictionary(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Buffer> for Value {
    fn from(v: Buffer) -> Self {
        Self::Binary(v)
    }
}

impl From<AudioFormat> for Value {
    fn from(v: AudioFormat) -> Self {
        Self::AudioFormat(Box::new(v))
    }
}

impl From<VideoFormat> for Value {
    fn from(v: VideoFormat) -> Self {
        Self::VideoFormat(Box::new(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_compares_equal() {
        let mut d = Dictionary::new();
        d.set("a", Value::Int(1));
        d.set("nested", Value::Array({
            let mut a = Array::new();
            a.push(Value::from("x"));
            a.push(Value::Float(0.5));
            a
        }));
        let v = Value::Dictionary(d);
        assert_eq!(v.clone(), v);
    }

    #[test]
    fn take_leaves_undefined() {
        let mut v = Value::from("hello");
        let moved = v.take();
        assert_eq!(moved, Value::from("hello"));
        assert!(v.is_undefined());
    }

    #[test]
    fn append_promotes_to_array() {
        let mut v = Value::Undefined;
        v.append(Value::Int(1));
        assert_eq!(v, Value::Int(1));
        assert_eq!(v.num_items(), 1);

        v.append(Value::Int(2));
        assert_eq!(v.value_type(), ValueType::Array);
        assert_eq!(v.num_items(), 2);

        v.append(Value::Int(3));
        assert_eq!(v.num_items(), 3);
        assert_eq!(v.get_item(2), Some(&Value::Int(3)));
    }

    #[test]
    fn get_item_on_scalar() {
        let v = Value::Long(7);
        assert_eq!(v.get_item(0), Some(&Value::Long(7)));
        assert_eq!(v.get_item(1), None);
        assert_eq!(Value::Undefined.get_item(0), None);
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(Value::from("42").get_int(), Some(42));
        assert_eq!(Value::from("42x").get_int(), None);
        assert_eq!(Value::Float(3.7).get_int(), Some(3));
        assert_eq!(Value::Int(5).get_float(), Some(5.0));
        assert_eq!(Value::from("2.5").get_float(), Some(2.5));
        assert_eq!(Value::Long(1 << 40).get_long(), Some(1 << 40));
    }

    #[test]
    fn from_string_sniffs_type() {
        let mut v = Value::Undefined;
        v.from_string("123");
        assert_eq!(v, Value::Long(123));

        let mut v = Value::Undefined;
        v.from_string("1.25");
        assert_eq!(v, Value::Float(1.25));

        let mut v = Value::Undefined;
        v.from_string("12 monkeys");
        assert_eq!(v, Value::from("12 monkeys"));
    }

    #[test]
    fn type_names_round_trip() {
        for t in [
            ValueType::Int,
            ValueType::Long,
            ValueType::Float,
            ValueType::String,
            ValueType::AudioFormat,
            ValueType::VideoFormat,
            ValueType::ColorRgb,
            ValueType::ColorRgba,
            ValueType::Position,
            ValueType::Dictionary,
            ValueType::Array,
            ValueType::Binary,
        ] {
            assert_eq!(ValueType::from_short_name(t.short_name()), Some(t));
            assert_eq!(ValueType::from_tag(t.tag()), Some(t));
        }
    }
}
