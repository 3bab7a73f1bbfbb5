//! Mutable bookkeeping threaded through code generation: the textual output
//! buffer plus the counters and maps needed to name temporaries, labels, and
//! locals as the IR is walked.

use crate::types::Type;
use std::collections::HashMap;
use std::fmt::Write as _;

pub struct CodegenState {
    pub out: String,
    next_temp: u32,
    next_label: u32,
    /// Maps a local's source name to the register holding its address
    /// (locals are always stack slots, loaded/stored explicitly).
    locals: HashMap<String, (String, Type)>,
}

impl CodegenState {
    pub fn new() -> Self {
        CodegenState {
            out: String::new(),
            next_temp: 0,
            next_label: 0,
            locals: HashMap::new(),
        }
    }

    /// Allocates a fresh SSA temporary name, e.g. `%t3`.
    pub fn fresh_temp(&mut self) -> String {
        let name = format!("%t{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    /// Allocates a fresh block label, e.g. `if.then7`.
    pub fn fresh_label(&mut self, hint: &str) -> String {
        let name = format!("{}{}", hint, self.next_label);
        self.next_label += 1;
        name
    }

    pub fn bind_local(&mut self, name: &str, register: String, ty: Type) {
        self.locals.insert(name.to_string(), (register, ty));
    }

    pub fn local(&self, name: &str) -> Option<&(String, Type)> {
        self.locals.get(name)
    }

    pub fn unbind_local(&mut self, name: &str) {
        self.locals.remove(name);
    }

    /// Emits one line of textual IR, indented to match the rest of the
    /// function body.
    pub fn emit(&mut self, line: impl AsRef<str>) {
        self.out.push_str("  ");
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    pub fn emit_label(&mut self, label: &str) {
        let _ = writeln!(self.out, "{}:", label);
    }

    pub fn emit_raw(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }
}

impl Default for CodegenState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_temp_counts_up() {
        let mut st = CodegenState::new();
        assert_eq!(st.fresh_temp(), "%t0");
        assert_eq!(st.fresh_temp(), "%t1");
    }

    #[test]
    fn locals_roundtrip() {
        let mut st = CodegenState::new();
        st.bind_local("X", "%x.addr".to_string(), Type::Integer { lo: 0, hi: 9 });
        assert_eq!(st.local("X").unwrap().0, "%x.addr");
        st.unbind_local("X");
        assert!(st.local("X").is_none());
    }
}
