//! Insertion-ordered name → value map.

use crate::{Array, AudioFormat, Buffer, Value, VideoFormat};

/// An ordered sequence of `(name, Value)` entries.
///
/// Names are arbitrary UTF-8, case-sensitive by default; the `_i` accessor
/// variants match case-insensitively. Lookups are linear: typical
/// dictionaries have a handful of entries and iteration order is part of
/// the contract, so nothing is hashed.
///
/// Setting an existing name replaces the entry in place. Appending to an
/// existing name promotes the value to an array and pushes, which is how
/// multi-valued fields (multiple `src` entries etc.) are modeled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: Vec<(String, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Index of `name`, optionally ignoring case.
    pub fn find(&self, name: &str, ignore_case: bool) -> Option<usize> {
        if ignore_case {
            self.entries
                .iter()
                .position(|(n, _)| n.eq_ignore_ascii_case(name))
        } else {
            self.entries.iter().position(|(n, _)| n == name)
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name, false).map(|i| &self.entries[i].1)
    }

    /// Case-insensitive [`Dictionary::get`].
    pub fn get_i(&self, name: &str) -> Option<&Value> {
        self.find(name, true).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.find(name, false).map(|i| &mut self.entries[i].1)
    }

    /// Replace the entry under `name` in place, or append a new one.
    ///
    /// Returns true if the dictionary actually changed.
    pub fn set(&mut self, name: &str, val: impl Into<Value>) -> bool {
        self.set_internal(name, val.into(), false)
    }

    /// Case-insensitive [`Dictionary::set`].
    pub fn set_i(&mut self, name: &str, val: impl Into<Value>) -> bool {
        self.set_internal(name, val.into(), true)
    }

    fn set_internal(&mut self, name: &str, val: Value, ignore_case: bool) -> bool {
        match self.find(name, ignore_case) {
            Some(idx) => {
                if self.entries[idx].1 == val {
                    return false;
                }
                self.entries[idx].1 = val;
                true
            }
            None => {
                if val.is_undefined() {
                    return false;
                }
                self.entries.push((name.to_owned(), val));
                true
            }
        }
    }

    /// Remove the entry under `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.find(name, false)?;
        Some(self.entries.remove(idx).1)
    }

    /// Append under `name`: set if absent, otherwise promote the existing
    /// value to an array and push.
    pub fn append(&mut self, name: &str, val: impl Into<Value>) {
        self.append_internal(name, val.into(), false);
    }

    /// Case-insensitive [`Dictionary::append`].
    pub fn append_i(&mut self, name: &str, val: impl Into<Value>) {
        self.append_internal(name, val.into(), true);
    }

    fn append_internal(&mut self, name: &str, val: Value, ignore_case: bool) {
        match self.find(name, ignore_case) {
            Some(idx) => self.entries[idx].1.append(val),
            None => {
                self.entries.push((name.to_owned(), val));
            }
        }
    }

    /// Element `idx` of the possibly-scalar-or-array value under `name`.
    pub fn get_item(&self, name: &str, idx: usize) -> Option<&Value> {
        self.get(name)?.get_item(idx)
    }

    /// Case-insensitive [`Dictionary::get_item`].
    pub fn get_item_i(&self, name: &str, idx: usize) -> Option<&Value> {
        self.get_i(name)?.get_item(idx)
    }

    pub fn get_item_mut(&mut self, name: &str, idx: usize) -> Option<&mut Value> {
        self.get_mut(name)?.get_item_mut(idx)
    }

    /// Number of items under `name` (scalar-as-array convention).
    pub fn num_items(&self, name: &str) -> usize {
        self.get(name).map_or(0, Value::num_items)
    }

    /// Delete item `idx` of the value under `name`. A scalar entry is
    /// removed entirely when `idx` is 0.
    pub fn delete_item(&mut self, name: &str, idx: usize) {
        if let Some(v) = self.get_mut(name) {
            v.delete_item(idx);
            if v.is_undefined() {
                self.remove(name);
            }
        }
    }

    /* Typed accessors */

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_string_i(&self, name: &str) -> Option<&str> {
        self.get_i(name).and_then(Value::as_str)
    }

    pub fn set_string(&mut self, name: &str, val: &str) -> bool {
        self.set(name, Value::from(val))
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Value::get_int)
    }

    pub fn get_int_i(&self, name: &str) -> Option<i32> {
        self.get_i(name).and_then(Value::get_int)
    }

    pub fn set_int(&mut self, name: &str, val: i32) -> bool {
        self.set(name, Value::Int(val))
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::get_long)
    }

    pub fn set_long(&mut self, name: &str, val: i64) -> bool {
        self.set(name, Value::Long(val))
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::get_float)
    }

    pub fn set_float(&mut self, name: &str, val: f64) -> bool {
        self.set(name, Value::Float(val))
    }

    pub fn get_dictionary(&self, name: &str) -> Option<&Dictionary> {
        self.get(name).and_then(Value::as_dictionary)
    }

    pub fn get_dictionary_mut(&mut self, name: &str) -> Option<&mut Dictionary> {
        self.get_mut(name).and_then(Value::as_dictionary_mut)
    }

    pub fn set_dictionary(&mut self, name: &str, val: Dictionary) -> bool {
        self.set(name, Value::Dictionary(val))
    }

    /// The nested dictionary under `name`, inserting an empty one if absent.
    pub fn get_dictionary_create(&mut self, name: &str) -> &mut Dictionary {
        let idx = self.find(name, false).unwrap_or_else(|| {
            self.entries
                .push((name.to_owned(), Value::Dictionary(Dictionary::new())));
            self.entries.len() - 1
        });
        if !matches!(self.entries[idx].1, Value::Dictionary(_)) {
            self.entries[idx].1 = Value::Dictionary(Dictionary::new());
        }
        match &mut self.entries[idx].1 {
            Value::Dictionary(d) => d,
            _ => unreachable!(),
        }
    }

    pub fn get_array(&self, name: &str) -> Option<&Array> {
        self.get(name).and_then(Value::as_array)
    }

    pub fn get_array_mut(&mut self, name: &str) -> Option<&mut Array> {
        self.get_mut(name).and_then(Value::as_array_mut)
    }

    pub fn set_array(&mut self, name: &str, val: Array) -> bool {
        self.set(name, Value::Array(val))
    }

    /// The nested array under `name`, inserting an empty one if absent.
    pub fn get_array_create(&mut self, name: &str) -> &mut Array {
        let idx = self.find(name, false).unwrap_or_else(|| {
            self.entries.push((name.to_owned(), Value::Array(Array::new())));
            self.entries.len() - 1
        });
        if !matches!(self.entries[idx].1, Value::Array(_)) {
            self.entries[idx].1 = Value::Array(Array::new());
        }
        match &mut self.entries[idx].1 {
            Value::Array(a) => a,
            _ => unreachable!(),
        }
    }

    pub fn get_binary(&self, name: &str) -> Option<&Buffer> {
        self.get(name).and_then(Value::as_binary)
    }

    pub fn set_binary(&mut self, name: &str, data: &[u8]) -> bool {
        self.set(name, Value::Binary(Buffer::from_slice(data)))
    }

    pub fn get_audio_format(&self, name: &str) -> Option<&AudioFormat> {
        self.get(name).and_then(Value::as_audio_format)
    }

    pub fn get_audio_format_mut(&mut self, name: &str) -> Option<&mut AudioFormat> {
        self.get_mut(name).and_then(Value::as_audio_format_mut)
    }

    pub fn set_audio_format(&mut self, name: &str, fmt: AudioFormat) -> bool {
        self.set(name, Value::from(fmt))
    }

    pub fn get_video_format(&self, name: &str) -> Option<&VideoFormat> {
        self.get(name).and_then(Value::as_video_format)
    }

    pub fn get_video_format_mut(&mut self, name: &str) -> Option<&mut VideoFormat> {
        self.get_mut(name).and_then(Value::as_video_format_mut)
    }

    pub fn set_video_format(&mut self, name: &str, fmt: VideoFormat) -> bool {
        self.set(name, Value::from(fmt))
    }

    /* String array convenience */

    /// Append `val` to the string array under `key` unless present.
    pub fn append_string_array(&mut self, key: &str, val: &str) {
        if self.has_string_array(key, val) {
            return;
        }
        self.append(key, Value::from(val));
    }

    /// Entry `idx` of the (scalar or array valued) string field `key`.
    pub fn get_string_array(&self, key: &str, idx: usize) -> Option<&str> {
        self.get_item(key, idx).and_then(Value::as_str)
    }

    /// True if the string field `key` contains `val`.
    pub fn has_string_array(&self, key: &str, val: &str) -> bool {
        let Some(v) = self.get(key) else {
            return false;
        };
        (0..v.num_items()).any(|i| v.get_item(i).and_then(Value::as_str) == Some(val))
    }

    /* Merging */

    /// Merge `src1` and `src2` into a fresh dictionary; `src1` wins, fields
    /// only present in `src2` are added after.
    pub fn merge(src1: &Dictionary, src2: &Dictionary) -> Dictionary {
        let mut dst = src1.clone();
        for (name, val) in &src2.entries {
            if dst.find(name, false).is_none() {
                dst.entries.push((name.clone(), val.clone()));
            }
        }
        dst
    }

    /// In-place merge: existing fields win, fields only in `src` are added.
    pub fn merge2(&mut self, src: &Dictionary) {
        for (name, val) in &src.entries {
            if self.find(name, false).is_none() {
                self.entries.push((name.clone(), val.clone()));
            }
        }
    }

    /// Overwrite fields of `self` with the fields of `src`.
    pub fn update_fields(&mut self, src: &Dictionary) {
        for (name, val) in &src.entries {
            self.set(name, val.clone());
        }
    }

    /// Remove all entries named in `names`.
    pub fn delete_fields(&mut self, names: &[&str]) {
        self.entries.retain(|(n, _)| !names.contains(&n.as_str()));
    }

    /// True if `name` is the final entry; used by streaming visitors.
    pub fn is_last(&self, name: &str) -> bool {
        self.entries.last().is_some_and(|(n, _)| n == name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, (String, Value)> {
        self.entries.iter_mut()
    }

    /// Entry at position `idx`.
    pub fn entry(&self, idx: usize) -> Option<(&str, &Value)> {
        self.entries.get(idx).map(|(n, v)| (n.as_str(), v))
    }

    /// Multi-line debug dump at the given indent depth.
    pub fn dump(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = String::from("{\n");
        for (name, val) in &self.entries {
            out.push_str(&format!("{pad}  {name}: {}\n", val.dump(indent + 2)));
        }
        out.push_str(&format!("{pad}}}"));
        out
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_replaces_in_place() {
        let mut d = Dictionary::new();
        d.set("a", 1);
        d.set("b", 2);
        d.set("a", 3);
        let entries: Vec<_> = d.iter().map(|(n, v)| (n.as_str(), v.clone())).collect();
        assert_eq!(
            entries,
            vec![("a", Value::Int(3)), ("b", Value::Int(2))]
        );
    }

    #[test]
    fn set_reports_change() {
        let mut d = Dictionary::new();
        assert!(d.set("a", 1));
        assert!(!d.set("a", 1));
        assert!(d.set("a", 2));
    }

    #[test]
    fn append_promotes_to_array() {
        let mut d = Dictionary::new();
        d.append("x", 1);
        assert_eq!(d.get("x"), Some(&Value::Int(1)));

        d.append("x", 2);
        let arr: Array = [Value::Int(1), Value::Int(2)].into_iter().collect();
        assert_eq!(d.get("x"), Some(&Value::Array(arr)));

        d.append("x", 3);
        assert_eq!(d.num_items("x"), 3);
        assert_eq!(d.get_item("x", 2), Some(&Value::Int(3)));
    }

    #[test]
    fn case_insensitive_accessors() {
        let mut d = Dictionary::new();
        d.set("Content-Type", "text/plain");
        assert_eq!(d.get_string("content-type"), None);
        assert_eq!(d.get_string_i("content-type"), Some("text/plain"));
        d.set_i("CONTENT-TYPE", "text/html");
        assert_eq!(d.len(), 1);
        assert_eq!(d.get_string("Content-Type"), Some("text/html"));
    }

    #[test]
    fn merge_priorities() {
        let mut a = Dictionary::new();
        a.set("x", 1);
        a.set("y", 2);
        let mut b = Dictionary::new();
        b.set("y", 20);
        b.set("z", 30);

        let merged = Dictionary::merge(&a, &b);
        assert_eq!(merged.get_int("x"), Some(1));
        assert_eq!(merged.get_int("y"), Some(2));
        assert_eq!(merged.get_int("z"), Some(30));

        let mut c = a.clone();
        c.merge2(&b);
        assert_eq!(c, merged);

        let mut d = a.clone();
        d.update_fields(&b);
        assert_eq!(d.get_int("y"), Some(20));
    }

    #[test]
    fn compare_is_positional() {
        let mut a = Dictionary::new();
        a.set("x", 1);
        a.set("y", 2);
        let mut b = Dictionary::new();
        b.set("y", 2);
        b.set("x", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn delete_fields_and_is_last() {
        let mut d = Dictionary::new();
        d.set("a", 1);
        d.set("b", 2);
        d.set("c", 3);
        assert!(d.is_last("c"));
        assert!(!d.is_last("a"));
        d.delete_fields(&["a", "c"]);
        assert_eq!(d.len(), 1);
        assert!(d.is_last("b"));
    }

    #[test]
    fn create_accessors_insert_defaults() {
        let mut d = Dictionary::new();
        d.get_dictionary_create("meta").set("k", "v");
        assert_eq!(
            d.get_dictionary("meta").and_then(|m| m.get_string("k")),
            Some("v")
        );
        d.get_array_create("list").push(Value::Int(1));
        assert_eq!(d.get_array("list").map(Array::len), Some(1));
    }

    #[test]
    fn string_array_field() {
        let mut d = Dictionary::new();
        d.append_string_array("src", "file:///a");
        d.append_string_array("src", "file:///b");
        d.append_string_array("src", "file:///a"); // duplicate, ignored
        assert_eq!(d.num_items("src"), 2);
        assert!(d.has_string_array("src", "file:///b"));
        assert_eq!(d.get_string_array("src", 1), Some("file:///b"));
    }

    #[test]
    fn delete_item_collapses_scalar() {
        let mut d = Dictionary::new();
        d.set("one", 1);
        d.delete_item("one", 0);
        assert!(d.get("one").is_none());
    }
}
