//! Finite-state-machine synthesis.
//!
//! An [`Fsm`] is an authoring construct: states are declared in first-use
//! order with action lists that may contain ordinary statements plus the
//! [`FsmStatement::NextState`] and [`FsmStatement::NextValue`]
//! pseudo-statements. [`Fsm::finalize`] desugars the whole machine into a
//! plain [`Fragment`] (a state register, combinational next-state logic
//! defaulting to "hold", shadow next-value registers, and the requested
//! entering/leaving pulse signals) which then flows through the ordinary
//! lowering pipeline. Finalization consumes the machine, so a finalized
//! FSM cannot be mutated.

#![warn(missing_docs)]

use silica_common::{bits_for, Ident};
use silica_ir::stmt::assign;
use silica_ir::{
    CaseArm, Constant, Context, Expr, Fragment, SignalId, SignalOpts, Statement,
};
use std::collections::BTreeMap;

/// Errors raised when finalizing a state machine.
#[derive(Debug, thiserror::Error)]
pub enum FsmError {
    /// The machine declares no states at all.
    #[error("state machine has no states")]
    Empty,
    /// A transition or reset designation names an undeclared state.
    #[error("unknown state: '{0}'")]
    UnknownState(String),
}

/// One arm of an [`FsmStatement::Case`].
#[derive(Debug, Clone)]
pub struct FsmCaseArm {
    /// The constant values matched by this arm.
    pub patterns: Vec<Constant>,
    /// The body executed when matched.
    pub body: Vec<FsmStatement>,
}

/// A statement inside a state's action list.
///
/// Mirrors [`Statement`] so transitions and registered updates can sit
/// inside branches, while remaining a closed type the synthesizer matches
/// exhaustively.
#[derive(Debug, Clone)]
pub enum FsmStatement {
    /// An ordinary combinational statement, active while in the state.
    Plain(Statement),
    /// Requests a transition to the named state.
    NextState(String),
    /// Requests `target` be loaded with `value` on the next clock edge.
    NextValue(Expr, Expr),
    /// A conditional branch.
    If {
        /// The condition expression.
        cond: Expr,
        /// Statements active when the condition holds.
        then_body: Vec<FsmStatement>,
        /// Statements active otherwise.
        else_body: Vec<FsmStatement>,
    },
    /// A case branch.
    Case {
        /// The subject being matched.
        subject: Expr,
        /// The match arms.
        arms: Vec<FsmCaseArm>,
        /// The default body.
        default: Vec<FsmStatement>,
    },
}

/// The fragment and bookkeeping produced by [`Fsm::finalize`].
pub struct FsmOutput {
    /// The synthesized logic, ready for the lowering pipeline.
    pub fragment: Fragment,
    /// The current-state register.
    pub state: SignalId,
    /// The combinational next-state signal.
    pub next_state: SignalId,
    /// State names with their dense encodings, in declaration order.
    pub encoding: Vec<(String, u64)>,
}

/// A finite-state-machine builder.
pub struct Fsm {
    clock_domain: Ident,
    reset_state: Option<String>,
    states: Vec<String>,
    actions: BTreeMap<String, Vec<FsmStatement>>,
    aliases: BTreeMap<String, String>,
    before_entering: BTreeMap<String, SignalId>,
    before_leaving: BTreeMap<String, SignalId>,
    after_entering: BTreeMap<String, SignalId>,
    after_leaving: BTreeMap<String, SignalId>,
    anon: u32,
}

impl Fsm {
    /// Creates an empty machine clocked by the named domain.
    pub fn new(clock_domain: Ident) -> Self {
        Self {
            clock_domain,
            reset_state: None,
            states: Vec::new(),
            actions: BTreeMap::new(),
            aliases: BTreeMap::new(),
            before_entering: BTreeMap::new(),
            before_leaving: BTreeMap::new(),
            after_entering: BTreeMap::new(),
            after_leaving: BTreeMap::new(),
            anon: 0,
        }
    }

    /// Designates the reset state explicitly. Without this, the first
    /// state passed to [`act`](Self::act) is the reset state.
    pub fn reset_state(&mut self, state: &str) -> &mut Self {
        self.reset_state = Some(state.to_string());
        self
    }

    fn register_state(&mut self, state: &str) {
        if !self.actions.contains_key(state) {
            self.states.push(state.to_string());
            self.actions.insert(state.to_string(), Vec::new());
        }
    }

    /// Appends actions to a state, declaring the state on first use.
    pub fn act(&mut self, state: &str, statements: Vec<FsmStatement>) -> &mut Self {
        if self.reset_state.is_none() {
            self.reset_state = Some(state.to_string());
        }
        self.register_state(state);
        if let Some(actions) = self.actions.get_mut(state) {
            actions.extend(statements);
        }
        self
    }

    /// Returns a one-bit signal asserted while the machine is in `state`.
    pub fn ongoing(&mut self, ctx: &mut Context, state: &str) -> SignalId {
        let sig = ctx.signal("ongoing", 1);
        self.act(state, vec![FsmStatement::Plain(assign(sig, 1))]);
        sig
    }

    /// Declares `name` to reach `target` after `delay` cycles, inserting
    /// anonymous filler states. A zero delay makes `name` an alias of
    /// `target`.
    pub fn delayed_enter(&mut self, name: &str, target: &str, delay: u32) {
        if delay == 0 {
            self.aliases.insert(name.to_string(), target.to_string());
            return;
        }
        let mut state = name.to_string();
        for i in 0..delay {
            let next = if i == delay - 1 {
                target.to_string()
            } else {
                self.fresh_anonymous_state()
            };
            self.act(&state, vec![FsmStatement::NextState(next.clone())]);
            state = next;
        }
    }

    fn fresh_anonymous_state(&mut self) -> String {
        loop {
            let candidate = format!("anonymous_{}", self.anon);
            self.anon += 1;
            if !self.actions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn pulse_signal(
        ctx: &mut Context,
        map: &mut BTreeMap<String, SignalId>,
        name: &str,
        state: &str,
    ) -> SignalId {
        if let Some(&sig) = map.get(state) {
            return sig;
        }
        let sig = ctx.signal(name, 1);
        map.insert(state.to_string(), sig);
        sig
    }

    /// Returns a signal asserted combinationally one cycle before the
    /// machine enters `state`. Declares the state if needed.
    pub fn before_entering(&mut self, ctx: &mut Context, state: &str) -> SignalId {
        self.register_state(state);
        Self::pulse_signal(ctx, &mut self.before_entering, "before_entering", state)
    }

    /// Returns a signal asserted combinationally while the machine is
    /// leaving `state`. Declares the state if needed.
    pub fn before_leaving(&mut self, ctx: &mut Context, state: &str) -> SignalId {
        self.register_state(state);
        Self::pulse_signal(ctx, &mut self.before_leaving, "before_leaving", state)
    }

    /// Returns a registered signal asserted the cycle after the machine
    /// enters `state`. Declares the state if needed.
    pub fn after_entering(&mut self, ctx: &mut Context, state: &str) -> SignalId {
        self.before_entering(ctx, state);
        self.register_state(state);
        Self::pulse_signal(ctx, &mut self.after_entering, "after_entering", state)
    }

    /// Returns a registered signal asserted the cycle after the machine
    /// leaves `state`. Declares the state if needed.
    pub fn after_leaving(&mut self, ctx: &mut Context, state: &str) -> SignalId {
        self.before_leaving(ctx, state);
        self.register_state(state);
        Self::pulse_signal(ctx, &mut self.after_leaving, "after_leaving", state)
    }

    /// Synthesizes the machine into a fragment, consuming the builder.
    ///
    /// The state and action tables are frozen by the move; no further
    /// mutation is possible once finalization has run.
    pub fn finalize(self, ctx: &mut Context) -> Result<FsmOutput, FsmError> {
        let Fsm {
            clock_domain,
            reset_state,
            states,
            actions,
            aliases,
            before_entering,
            before_leaving,
            after_entering,
            after_leaving,
            ..
        } = self;

        if states.is_empty() {
            return Err(FsmError::Empty);
        }
        let encoding: BTreeMap<String, u64> = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u64))
            .collect();
        let reset_name = match reset_state {
            Some(name) => name,
            None => states[0].clone(),
        };
        let reset_code = *encoding
            .get(&reset_name)
            .ok_or_else(|| FsmError::UnknownState(reset_name.clone()))?;

        let width = bits_for(states.len() as i64 - 1, false);
        let state = ctx.signal_opts(
            "state",
            width,
            SignalOpts {
                reset: Some(reset_code as i64),
                ..Default::default()
            },
        );
        let next_state = ctx.signal("next_state", width);

        let mut lowerer = NextLowerer {
            next_state,
            width,
            encoding: &encoding,
            aliases: &aliases,
            registers: Vec::new(),
        };

        let mut arms = Vec::new();
        let mut default = Vec::new();
        for name in &states {
            let body = match actions.get(name) {
                Some(stmts) => lowerer.lower_body(ctx, stmts)?,
                None => Vec::new(),
            };
            if *name == reset_name {
                default = body;
            } else if !body.is_empty() {
                arms.push(CaseArm {
                    patterns: vec![Constant::new(encoding[name] as i64, width, false)],
                    body,
                });
            }
        }

        let mut fragment = Fragment::new();
        // Hold the current state unless an action requests a transition.
        fragment.comb.push(assign(next_state, state));
        fragment.comb.push(Statement::Case {
            subject: Expr::Signal(state),
            arms,
            default,
        });
        fragment.add_sync(clock_domain, assign(state, next_state));
        for reg in &lowerer.registers {
            fragment.add_sync(
                clock_domain,
                Statement::If {
                    cond: Expr::Signal(reg.enable),
                    then_body: vec![Statement::Assign {
                        target: reg.target.clone(),
                        value: Expr::Signal(reg.next_value),
                    }],
                    else_body: Vec::new(),
                },
            );
        }

        let state_eq = |code: u64| Expr::from(state).cmp_eq(Constant::new(code as i64, width, false));
        let next_eq =
            |code: u64| Expr::from(next_state).cmp_eq(Constant::new(code as i64, width, false));

        for (name, sig) in &before_leaving {
            let code = *encoding
                .get(name)
                .ok_or_else(|| FsmError::UnknownState(name.clone()))?;
            fragment
                .comb
                .push(assign(*sig, state_eq(code) & !next_eq(code)));
        }
        for (name, sig) in &before_entering {
            let code = *encoding
                .get(name)
                .ok_or_else(|| FsmError::UnknownState(name.clone()))?;
            fragment
                .comb
                .push(assign(*sig, !state_eq(code) & next_eq(code)));
        }
        for (name, sig) in &after_entering {
            // The machine enters its reset state out of reset.
            if *name == reset_name {
                ctx.signals.get_mut(*sig).reset = Some(1);
            }
            fragment.add_sync(clock_domain, assign(*sig, before_entering[name]));
        }
        for (name, sig) in &after_leaving {
            fragment.add_sync(clock_domain, assign(*sig, before_leaving[name]));
        }

        let encoding_list = states
            .iter()
            .map(|s| (s.clone(), encoding[s]))
            .collect();
        Ok(FsmOutput {
            fragment,
            state,
            next_state,
            encoding: encoding_list,
        })
    }
}

/// A shadow register pair for one [`FsmStatement::NextValue`] target.
struct ShadowRegister {
    target: Expr,
    enable: SignalId,
    next_value: SignalId,
}

/// Lowers pseudo-statements, deduplicating shadow registers by structural
/// target equality so repeated targets share one pair across states.
struct NextLowerer<'a> {
    next_state: SignalId,
    width: u32,
    encoding: &'a BTreeMap<String, u64>,
    aliases: &'a BTreeMap<String, String>,
    registers: Vec<ShadowRegister>,
}

impl NextLowerer<'_> {
    fn lower_body(
        &mut self,
        ctx: &mut Context,
        body: &[FsmStatement],
    ) -> Result<Vec<Statement>, FsmError> {
        let mut out = Vec::new();
        for stmt in body {
            self.lower_stmt(ctx, stmt, &mut out)?;
        }
        Ok(out)
    }

    fn lower_stmt(
        &mut self,
        ctx: &mut Context,
        stmt: &FsmStatement,
        out: &mut Vec<Statement>,
    ) -> Result<(), FsmError> {
        match stmt {
            FsmStatement::Plain(s) => out.push(s.clone()),
            FsmStatement::NextState(name) => {
                let resolved = self.aliases.get(name).unwrap_or(name);
                let code = *self
                    .encoding
                    .get(resolved)
                    .ok_or_else(|| FsmError::UnknownState(resolved.clone()))?;
                out.push(assign(
                    self.next_state,
                    Constant::new(code as i64, self.width, false),
                ));
            }
            FsmStatement::NextValue(target, value) => {
                let (enable, next_value) = self.shadow_for(ctx, target);
                out.push(assign(next_value, value.clone()));
                out.push(assign(enable, 1));
            }
            FsmStatement::If {
                cond,
                then_body,
                else_body,
            } => {
                let then_body = self.lower_body(ctx, then_body)?;
                let else_body = self.lower_body(ctx, else_body)?;
                out.push(Statement::If {
                    cond: cond.clone(),
                    then_body,
                    else_body,
                });
            }
            FsmStatement::Case {
                subject,
                arms,
                default,
            } => {
                let mut lowered_arms = Vec::with_capacity(arms.len());
                for arm in arms {
                    lowered_arms.push(CaseArm {
                        patterns: arm.patterns.clone(),
                        body: self.lower_body(ctx, &arm.body)?,
                    });
                }
                out.push(Statement::Case {
                    subject: subject.clone(),
                    arms: lowered_arms,
                    default: self.lower_body(ctx, default)?,
                });
            }
        }
        Ok(())
    }

    fn shadow_for(&mut self, ctx: &mut Context, target: &Expr) -> (SignalId, SignalId) {
        if let Some(reg) = self.registers.iter().find(|r| &r.target == target) {
            return (reg.enable, reg.next_value);
        }
        let shape = silica_ir::shape(ctx, target);
        let related = match target {
            Expr::Signal(id) => Some(*id),
            _ => None,
        };
        let next_value = ctx.signal_opts(
            "next_value",
            shape.width,
            SignalOpts {
                signed: shape.signed,
                related,
                ..Default::default()
            },
        );
        let enable = ctx.signal_opts(
            "next_value_ce",
            1,
            SignalOpts {
                related,
                ..Default::default()
            },
        );
        self.registers.push(ShadowRegister {
            target: target.clone(),
            enable,
            next_value,
        });
        (enable, next_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_and_domain() -> (Context, Ident) {
        let ctx = Context::new();
        let sys = ctx.intern("sys");
        (ctx, sys)
    }

    #[test]
    fn encoding_follows_declaration_order() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("A", vec![]).act("B", vec![]).act("C", vec![]);
        // Re-acting on an existing state must not re-register it.
        fsm.act("B", vec![]);
        let out = fsm.finalize(&mut ctx).unwrap();
        assert_eq!(
            out.encoding,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 1),
                ("C".to_string(), 2)
            ]
        );
    }

    #[test]
    fn reset_state_defaults_to_first_declared() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("IDLE", vec![]).act("RUN", vec![]);
        let out = fsm.finalize(&mut ctx).unwrap();
        assert_eq!(ctx.signals[out.state].reset, Some(0));
    }

    #[test]
    fn explicit_reset_state_respected() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.reset_state("RUN");
        fsm.act("IDLE", vec![]).act("RUN", vec![]);
        let out = fsm.finalize(&mut ctx).unwrap();
        assert_eq!(ctx.signals[out.state].reset, Some(1));
    }

    #[test]
    fn pulse_request_registers_state() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.before_entering(&mut ctx, "A");
        fsm.act("B", vec![FsmStatement::NextState("A".to_string())]);
        let out = fsm.finalize(&mut ctx).unwrap();
        // "A" was declared by the pulse request, with an empty action list.
        assert_eq!(out.encoding[0].0, "A");
        assert_eq!(out.encoding.len(), 2);
    }

    #[test]
    fn unknown_transition_target_is_fatal() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("A", vec![FsmStatement::NextState("MISSING".to_string())]);
        match fsm.finalize(&mut ctx) {
            Err(FsmError::UnknownState(name)) => assert_eq!(name, "MISSING"),
            other => panic!("expected UnknownState, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn empty_machine_is_fatal() {
        let (mut ctx, sys) = ctx_and_domain();
        let fsm = Fsm::new(sys);
        assert!(matches!(fsm.finalize(&mut ctx), Err(FsmError::Empty)));
    }

    #[test]
    fn next_value_targets_share_one_shadow_pair() {
        let (mut ctx, sys) = ctx_and_domain();
        let reg = ctx.signal("reg", 8);
        let mut fsm = Fsm::new(sys);
        fsm.act(
            "A",
            vec![
                FsmStatement::NextValue(Expr::from(reg), Expr::from(1)),
                FsmStatement::NextState("B".to_string()),
            ],
        );
        fsm.act(
            "B",
            vec![
                FsmStatement::NextValue(Expr::from(reg), Expr::from(2)),
                FsmStatement::NextState("A".to_string()),
            ],
        );
        let out = fsm.finalize(&mut ctx).unwrap();
        // One commit for the state register, one for the shared shadow pair.
        assert_eq!(out.fragment.sync[&sys].len(), 2);
    }

    #[test]
    fn hold_is_the_comb_default() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("A", vec![]);
        let out = fsm.finalize(&mut ctx).unwrap();
        assert_eq!(
            out.fragment.comb[0],
            assign(out.next_state, out.state)
        );
    }

    #[test]
    fn delayed_enter_inserts_filler_states() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("START", vec![]).act("DONE", vec![]);
        fsm.delayed_enter("WAIT", "DONE", 3);
        let out = fsm.finalize(&mut ctx).unwrap();
        // START, DONE, WAIT, plus two anonymous fillers.
        assert_eq!(out.encoding.len(), 5);
    }

    #[test]
    fn delayed_enter_zero_is_an_alias() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("DONE", vec![]);
        fsm.delayed_enter("WAIT", "DONE", 0);
        fsm.act("A", vec![FsmStatement::NextState("WAIT".to_string())]);
        let out = fsm.finalize(&mut ctx).unwrap();
        // No extra state was created for the alias.
        assert_eq!(out.encoding.len(), 2);
    }

    #[test]
    fn ongoing_signal_asserted_in_state() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("A", vec![]).act("B", vec![]);
        let busy = fsm.ongoing(&mut ctx, "B");
        let out = fsm.finalize(&mut ctx).unwrap();
        // The case must contain an arm driving `busy` high.
        let case = &out.fragment.comb[1];
        match case {
            Statement::Case { arms, .. } => {
                assert!(arms.iter().any(|arm| arm
                    .body
                    .iter()
                    .any(|s| matches!(s, Statement::Assign { target, .. } if *target == Expr::Signal(busy)))));
            }
            other => panic!("expected Case, got {other:?}"),
        }
    }

    #[test]
    fn after_entering_reset_state_starts_high() {
        let (mut ctx, sys) = ctx_and_domain();
        let mut fsm = Fsm::new(sys);
        fsm.act("IDLE", vec![]).act("RUN", vec![]);
        let pulse = fsm.after_entering(&mut ctx, "IDLE");
        let _ = fsm.finalize(&mut ctx).unwrap();
        assert_eq!(ctx.signals[pulse].reset, Some(1));
    }
}
