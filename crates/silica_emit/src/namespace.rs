//! The namespace allocator.
//!
//! Builds an injective mapping from signal/special identity to a
//! backend-legal identifier, once per compilation, before rendering
//! begins. Iteration is strictly in creation order and collisions are
//! resolved with numeric suffixes, so re-running allocation on the same
//! context is deterministic bit-for-bit.

use silica_ir::analysis::fragment_signals;
use silica_ir::{Context, Fragment, MemoryPortMode, SignalId, Special, SpecialId};
use std::collections::{BTreeMap, BTreeSet};

/// A key into the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NsKey {
    Signal(SignalId),
    Special(SpecialId),
    /// The registered address/data signal a backend materializes for a
    /// synchronous memory port; allocated up front so the namespace is
    /// frozen before rendering.
    MemoryPortReg(SpecialId, u32),
}

/// An injective, frozen mapping from IR identity to emitted identifier.
#[derive(Debug, Clone)]
pub struct Namespace {
    names: BTreeMap<NsKey, String>,
}

impl Namespace {
    /// Allocates names for every signal reachable from `fragment`, the
    /// caller-supplied `extra_ios`, every special, and the auxiliary
    /// registers memory ports will need.
    ///
    /// `reserved` is the dialect keyword set; `case_sensitive` is false
    /// for dialects (like VHDL) where identifiers differing only in case
    /// collide.
    pub fn build(
        ctx: &Context,
        fragment: &Fragment,
        extra_ios: &BTreeSet<SignalId>,
        reserved: &[&str],
        case_sensitive: bool,
    ) -> Namespace {
        let mut allocator = Allocator {
            used: reserved.iter().map(|k| k.to_lowercase()).collect(),
            case_sensitive,
        };
        // Instantiated primitive type names live in the same scope as
        // emitted identifiers; reserve them so no label or signal shadows
        // a component/module type.
        for &id in &fragment.specials {
            if let Special::Instance(inst) = &ctx.specials[id] {
                allocator.used.insert(if case_sensitive {
                    sanitize(&inst.of)
                } else {
                    sanitize(&inst.of).to_lowercase()
                });
            }
        }
        let mut names = BTreeMap::new();

        let mut signals = fragment_signals(ctx, fragment);
        signals.extend(extra_ios.iter().copied());
        for id in signals {
            let sig = &ctx.signals[id];
            let mut base = sanitize(ctx.resolve(sig.name));
            if let Some(related) = sig.related {
                base = format!("{}_{}", sanitize(ctx.signal_name(related)), base);
            }
            names.insert(NsKey::Signal(id), allocator.allocate(&base));
        }

        for &id in &fragment.specials {
            let special = &ctx.specials[id];
            let base = sanitize(special.name_hint());
            names.insert(NsKey::Special(id), allocator.allocate(&base));
            if let Special::Memory(mem) = special {
                for (index, port) in mem.ports.iter().enumerate() {
                    if port.async_read {
                        continue;
                    }
                    let aux = if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                        "memadr"
                    } else {
                        "memdat"
                    };
                    names.insert(
                        NsKey::MemoryPortReg(id, index as u32),
                        allocator.allocate(aux),
                    );
                }
            }
        }

        Namespace { names }
    }

    /// Returns the identifier assigned to a signal.
    ///
    /// # Panics
    ///
    /// Panics if the signal was not part of the compilation the namespace
    /// was built for.
    pub fn signal(&self, id: SignalId) -> &str {
        &self.names[&NsKey::Signal(id)]
    }

    /// Returns the identifier assigned to a special.
    ///
    /// # Panics
    ///
    /// Panics if the special was not part of the compilation.
    pub fn special(&self, id: SpecialId) -> &str {
        &self.names[&NsKey::Special(id)]
    }

    /// Returns the identifier pre-allocated for a memory port's auxiliary
    /// register, if the port needed one.
    pub fn memory_port_reg(&self, id: SpecialId, port: u32) -> Option<&str> {
        self.names
            .get(&NsKey::MemoryPortReg(id, port))
            .map(String::as_str)
    }

    /// Looks up a signal without panicking.
    pub fn try_signal(&self, id: SignalId) -> Option<&str> {
        self.names.get(&NsKey::Signal(id)).map(String::as_str)
    }
}

struct Allocator {
    used: BTreeSet<String>,
    case_sensitive: bool,
}

impl Allocator {
    fn allocate(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 0u32;
        loop {
            let key = if self.case_sensitive {
                candidate.clone()
            } else {
                candidate.to_lowercase()
            };
            if !self.used.contains(&key) {
                self.used.insert(key);
                return candidate;
            }
            counter += 1;
            candidate = format!("{base}_{counter}");
        }
    }
}

/// Maps an arbitrary name hint to a legal identifier stem: alphanumerics
/// and underscores only, never empty, never leading with a digit.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push_str("anon");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "sig_");
    }
    out
}
