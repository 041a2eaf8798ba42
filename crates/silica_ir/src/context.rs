//! The per-compilation context.
//!
//! A [`Context`] owns every [`Signal`] and [`Special`] of one compilation,
//! hands out their IDs in monotonic creation order, and interns all names.
//! Unrelated compilations own unrelated contexts and never share state, so
//! creation-order tie-breaking cannot leak between them.

use crate::arena::Arena;
use crate::ids::{SignalId, SpecialId};
use crate::signal::Signal;
use crate::special::Special;
use silica_common::{Ident, Interner};

/// Optional attributes for signal construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalOpts {
    /// Two's-complement signed arithmetic.
    pub signed: bool,
    /// Value loaded when the owning clock domain's reset is asserted.
    pub reset: Option<i64>,
    /// Naming hint: the signal this one is derived from.
    pub related: Option<SignalId>,
}

/// Per-compilation state: signal and special arenas plus the name interner.
pub struct Context {
    /// All signals of this compilation, in creation order.
    pub signals: Arena<SignalId, Signal>,
    /// All specials of this compilation, in creation order.
    pub specials: Arena<SpecialId, Special>,
    interner: Interner,
}

impl Context {
    /// Creates a fresh, empty compilation context.
    pub fn new() -> Self {
        Self {
            signals: Arena::new(),
            specials: Arena::new(),
            interner: Interner::new(),
        }
    }

    /// Interns a name, returning its [`Ident`].
    pub fn intern(&self, s: &str) -> Ident {
        self.interner.get_or_intern(s)
    }

    /// Resolves an interned name back to its string.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    /// Creates an unsigned signal with no reset value.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn signal(&mut self, name: &str, width: u32) -> SignalId {
        self.signal_opts(name, width, SignalOpts::default())
    }

    /// Creates a signal with the given optional attributes.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn signal_opts(&mut self, name: &str, width: u32, opts: SignalOpts) -> SignalId {
        assert!(width > 0, "signal width must be positive");
        let name = self.intern(name);
        let id = self.signals.next_id();
        self.signals.alloc(Signal {
            id,
            name,
            width,
            signed: opts.signed,
            reset: opts.reset,
            related: opts.related,
        })
    }

    /// Registers a special, returning its creation-order ID.
    pub fn add_special(&mut self, special: Special) -> SpecialId {
        self.specials.alloc(special)
    }

    /// Returns the declared name of a signal.
    pub fn signal_name(&self, id: SignalId) -> &str {
        self.resolve(self.signals[id].name)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
