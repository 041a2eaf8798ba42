//! The compilation unit.
//!
//! A [`Fragment`] aggregates combinational statements, per-domain
//! synchronous statements, specials, and clock-domain declarations.
//! Fragments combine by [`Fragment::merge`] (list concatenation,
//! map-of-lists merge, and set union), which is associative and
//! commutative up to statement order, enabling hierarchical composition
//! upstream of this core.

use crate::domain::ClockDomain;
use crate::ids::SpecialId;
use crate::stmt::Statement;
use serde::{Deserialize, Serialize};
use silica_common::Ident;
use std::collections::{BTreeMap, BTreeSet};

/// One compilation unit's statements, specials, and clock domains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fragment {
    /// Combinational statements, in program order.
    pub comb: Vec<Statement>,
    /// Synchronous statements, grouped by clock-domain name.
    pub sync: BTreeMap<Ident, Vec<Statement>>,
    /// Specials contained in this fragment.
    pub specials: BTreeSet<SpecialId>,
    /// Clock-domain declarations.
    pub clock_domains: Vec<ClockDomain>,
}

impl Fragment {
    /// Creates an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Combines two fragments: statement lists concatenate (`a` first),
    /// sync maps merge per domain, special sets union, clock-domain lists
    /// concatenate.
    pub fn merge(mut a: Fragment, b: Fragment) -> Fragment {
        a.comb.extend(b.comb);
        for (domain, stmts) in b.sync {
            a.sync.entry(domain).or_default().extend(stmts);
        }
        a.specials.extend(b.specials);
        a.clock_domains.extend(b.clock_domains);
        a
    }

    /// Appends a synchronous statement to the named domain's group.
    pub fn add_sync(&mut self, domain: Ident, stmt: Statement) {
        self.sync.entry(domain).or_default().push(stmt);
    }

    /// Looks up a clock domain declaration by name.
    pub fn domain(&self, name: Ident) -> Option<&ClockDomain> {
        self.clock_domains.iter().find(|cd| cd.name == name)
    }
}

/// Explicit-registration builder for authoring fragments.
///
/// Collects statements, specials, and domains into typed accumulators;
/// nothing is ever discovered by scanning attributes or reflection.
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    fragment: Fragment,
}

impl FragmentBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a combinational statement.
    pub fn comb(&mut self, stmt: Statement) -> &mut Self {
        self.fragment.comb.push(stmt);
        self
    }

    /// Registers a synchronous statement under the named clock domain.
    pub fn sync(&mut self, domain: Ident, stmt: Statement) -> &mut Self {
        self.fragment.add_sync(domain, stmt);
        self
    }

    /// Registers a special.
    pub fn special(&mut self, id: SpecialId) -> &mut Self {
        self.fragment.specials.insert(id);
        self
    }

    /// Registers a clock-domain declaration.
    pub fn clock_domain(&mut self, cd: ClockDomain) -> &mut Self {
        self.fragment.clock_domains.push(cd);
        self
    }

    /// Finishes building, returning the fragment.
    pub fn build(self) -> Fragment {
        self.fragment
    }
}
