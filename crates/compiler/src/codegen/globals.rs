//! String literal deduplication: every distinct string constant in a
//! compilation becomes exactly one global, referenced by every use site.

use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Default)]
pub struct Globals {
    constants: HashMap<String, String>,
    bounds: HashMap<(i64, i64), String>,
    counter: u32,
    bounds_counter: u32,
    pub decls: String,
}

impl Globals {
    pub fn new() -> Self {
        Globals::default()
    }

    /// Escapes a string for the textual IR's quoted-string global syntax:
    /// printable ASCII passes through, everything else becomes `\XX`.
    pub fn escape(s: &str) -> String {
        let mut out = String::new();
        for byte in s.as_bytes() {
            match *byte {
                b' '..=b'!' | b'#'..=b'[' | b']'..=b'~' => out.push(*byte as char),
                b'\\' => out.push_str(r"\\"),
                b'"' => out.push_str(r#"\22"#),
                _ => {
                    let _ = write!(&mut out, r"\{:02X}", byte);
                }
            }
        }
        out
    }

    /// Returns the name of the global holding `s`, creating it (and a
    /// NUL-terminated initializer) on first use.
    pub fn intern(&mut self, s: &str) -> String {
        if let Some(name) = self.constants.get(s) {
            return name.clone();
        }
        let name = format!("@.str.{}", self.counter);
        self.counter += 1;
        let len = s.len() + 1;
        let _ = writeln!(
            self.decls,
            "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
            name,
            len,
            Globals::escape(s)
        );
        self.constants.insert(s.to_string(), name.clone());
        name
    }

    /// Returns the name of a global `{ i64, i64 }` holding `(low, high)`,
    /// shaped to match `ada_rt::image::ArrayBounds` so the runtime's
    /// `ada_rt_array_first`/`_last`/`_length` can read it directly — used
    /// as the bounds word of a fat pointer built from a compile-time-sized
    /// array, e.g. a string literal.
    pub fn intern_bounds(&mut self, low: i64, high: i64) -> String {
        if let Some(name) = self.bounds.get(&(low, high)) {
            return name.clone();
        }
        let name = format!("@.bounds.{}", self.bounds_counter);
        self.bounds_counter += 1;
        let _ = writeln!(
            self.decls,
            "{} = private unnamed_addr constant {{ i64, i64 }} {{ i64 {}, i64 {} }}",
            name, low, high
        );
        self.bounds.insert((low, high), name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_string_twice_reuses_the_global() {
        let mut g = Globals::new();
        let a = g.intern("hello");
        let b = g.intern("hello");
        assert_eq!(a, b);
        assert_eq!(g.decls.matches("@.str.0").count(), 2);
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(Globals::escape("a\"b"), r#"a\22b"#);
    }

    #[test]
    fn interning_the_same_bounds_twice_reuses_the_global() {
        let mut g = Globals::new();
        let a = g.intern_bounds(1, 5);
        let b = g.intern_bounds(1, 5);
        assert_eq!(a, b);
        assert_eq!(g.decls.matches("@.bounds.0").count(), 2);
    }

    #[test]
    fn distinct_bounds_get_distinct_globals() {
        let mut g = Globals::new();
        let a = g.intern_bounds(1, 5);
        let b = g.intern_bounds(1, 6);
        assert_ne!(a, b);
    }
}
