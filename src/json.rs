//! Streaming JSON encoder.
//!
//! Writes JSON incrementally into a byte buffer while tracking open
//! containers, so callers never handle separators themselves. Strings only
//! have `"` escaped; backslashes, control characters and non-ASCII text are
//! written verbatim. Floats use Rust's `Display`, so NaN and infinities come
//! out as `NaN` and `inf`, which no JSON parser accepts; callers pass finite
//! values.

use bytes::BufMut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Object,
    Array,
}

impl Container {
    fn open(self) -> u8 {
        match self {
            Container::Object => b'{',
            Container::Array => b'[',
        }
    }

    fn close(self) -> u8 {
        match self {
            Container::Object => b'}',
            Container::Array => b']',
        }
    }
}

/// A scalar the encoder can write.
pub trait JsonValue {
    fn write_json<B: BufMut>(&self, out: &mut B);
}

impl JsonValue for str {
    fn write_json<B: BufMut>(&self, out: &mut B) {
        write_str(out, self);
    }
}

impl JsonValue for String {
    fn write_json<B: BufMut>(&self, out: &mut B) {
        write_str(out, self);
    }
}

impl JsonValue for bool {
    fn write_json<B: BufMut>(&self, out: &mut B) {
        out.put_slice(if *self { b"true" } else { b"false" });
    }
}

/// Non-finite values are written as `NaN`/`inf`/`-inf`, not valid JSON.
impl JsonValue for f64 {
    fn write_json<B: BufMut>(&self, out: &mut B) {
        out.put_slice(self.to_string().as_bytes());
    }
}

macro_rules! integer_json_value {
    ($($t:ty),*) => {
        $(impl JsonValue for $t {
            fn write_json<B: BufMut>(&self, out: &mut B) {
                out.put_slice(self.to_string().as_bytes());
            }
        })*
    };
}

integer_json_value!(i32, i64, u32, u64, usize);

impl<T: JsonValue + ?Sized> JsonValue for &T {
    fn write_json<B: BufMut>(&self, out: &mut B) {
        (**self).write_json(out);
    }
}

fn write_str<B: BufMut>(out: &mut B, s: &str) {
    out.put_u8(b'"');
    for chunk in s.split_inclusive('"') {
        match chunk.strip_suffix('"') {
            Some(body) => {
                out.put_slice(body.as_bytes());
                out.put_slice(b"\\\"");
            }
            None => out.put_slice(chunk.as_bytes()),
        }
    }
    out.put_u8(b'"');
}

struct Level {
    kind: Container,
    first: bool,
}

/// Depth-tracking JSON writer.
///
/// Containers still open when the writer is finished or dropped are closed
/// innermost first, and a trailing newline ends the document.
pub struct JsonWriter<'a, B: BufMut> {
    out: &'a mut B,
    stack: Vec<Level>,
    top_first: bool,
    finished: bool,
}

impl<'a, B: BufMut> JsonWriter<'a, B> {
    pub fn new(out: &'a mut B) -> Self {
        Self {
            out,
            stack: Vec::new(),
            top_first: true,
            finished: false,
        }
    }

    /// Creates a writer with `root` already opened.
    pub fn with_root(out: &'a mut B, root: Container) -> Self {
        let mut writer = Self::new(out);
        writer.open(root);
        writer
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens an unkeyed object (top level or inside an array).
    pub fn object(&mut self) {
        self.open(Container::Object);
    }

    /// Opens an unkeyed array.
    pub fn array(&mut self) {
        self.open(Container::Array);
    }

    /// Opens an object as the value of `key`.
    pub fn object_field(&mut self, key: &str) {
        self.key(key);
        self.push(Container::Object);
    }

    /// Opens an array as the value of `key`.
    pub fn array_field(&mut self, key: &str) {
        self.key(key);
        self.push(Container::Array);
    }

    /// Writes an unkeyed scalar.
    pub fn value<V: JsonValue + ?Sized>(&mut self, value: &V) {
        self.begin();
        value.write_json(self.out);
    }

    /// Writes `"key":value`.
    pub fn field<V: JsonValue + ?Sized>(&mut self, key: &str, value: &V) {
        self.key(key);
        value.write_json(self.out);
    }

    /// Closes the innermost container. Does nothing at depth zero.
    pub fn end(&mut self) {
        if let Some(level) = self.stack.pop() {
            self.out.put_u8(level.kind.close());
        }
    }

    /// Closes everything still open and writes the trailing newline.
    pub fn finish(mut self) {
        self.close_all();
    }

    fn open(&mut self, kind: Container) {
        self.begin();
        self.push(kind);
    }

    fn push(&mut self, kind: Container) {
        self.out.put_u8(kind.open());
        self.stack.push(Level { kind, first: true });
    }

    fn key(&mut self, key: &str) {
        self.begin();
        write_str(self.out, key);
        self.out.put_u8(b':');
    }

    // Comma before every element except the first at this level.
    fn begin(&mut self) {
        let first = match self.stack.last_mut() {
            Some(level) => &mut level.first,
            None => &mut self.top_first,
        };
        if !*first {
            self.out.put_u8(b',');
        }
        *first = false;
    }

    fn close_all(&mut self) {
        if self.finished {
            return;
        }
        while !self.stack.is_empty() {
            self.end();
        }
        self.out.put_u8(b'\n');
        self.finished = true;
    }
}

impl<B: BufMut> Drop for JsonWriter<'_, B> {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut JsonWriter<'_, Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        {
            let mut json = JsonWriter::new(&mut buf);
            f(&mut json);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn quotes_are_the_only_escape() {
        let out = render(|json| {
            json.array();
            json.value("say \"hi\"\\n");
        });
        assert_eq!(out, "[\"say \\\"hi\\\"\\n\"]\n");
    }

    #[test]
    fn non_finite_floats_written_verbatim() {
        let out = render(|json| {
            json.array();
            json.value(&1.5);
            json.value(&f64::NAN);
            json.value(&f64::NEG_INFINITY);
        });
        assert_eq!(out, "[1.5,NaN,-inf]\n");
    }

    #[test]
    fn drop_closes_open_containers() {
        let out = render(|json| {
            json.object();
            json.array_field("a");
            json.object();
            json.field("k", &1);
        });
        assert_eq!(out, "{\"a\":[{\"k\":1}]}\n");
    }
}
