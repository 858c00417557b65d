use std::cell::RefCell;
use std::fmt;

use indexmap::IndexSet;

thread_local! {
    /// Leaked strings live for the process lifetime, matching the lifetime of
    /// the single translation the process performs.
    static INTERNER: RefCell<IndexSet<&'static str>> = RefCell::new(IndexSet::new());
}

/// An interned identifier or keyword string.
///
/// Two `Symbol`s compare equal iff the strings they were interned from are
/// equal; comparison is a `u32` compare, not a string compare.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn intern(s: &str) -> Self {
        INTERNER.with(|interner| {
            let mut interner = interner.borrow_mut();
            if let Some(idx) = interner.get_index_of(s) {
                return Symbol(idx as u32);
            }
            let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
            let (idx, _) = interner.insert_full(leaked);
            Symbol(idx as u32)
        })
    }

    pub fn as_str(&self) -> &'static str {
        INTERNER.with(|interner| interner.borrow()[self.0 as usize])
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}
