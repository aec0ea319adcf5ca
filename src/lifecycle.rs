//! Shared recognizer lifecycle, independent of the metric being measured.
//!
//! The machine consumes facts about a frame (touches arrived, moved or
//! departed, and whether the concrete gesture currently has enough input
//! groups) and reports transitions through a bounded notice context. The
//! concrete gesture drivers own the policies that produce those facts.

use log::debug;
use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::config::{CancelPolicy, GestureCompletion};
use crate::types::GestureState;

/// Most notices one frame can produce: a transition per input batch plus a
/// re-entrant changed emission.
pub(crate) const MAX_NOTICES_PER_FRAME: usize = 4;

#[derive(Clone, Copy, Debug)]
pub(crate) enum LifecycleEvent {
    TouchesAdded { enough: bool },
    TouchesMoved { enough: bool },
    TouchesEnded { remaining: usize },
    TouchesCancelled { remaining: usize },
    Reset,
}

/// What the machine tells its driver about one handled event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LifecycleNotice {
    /// The machine entered this state.
    Entered(GestureState),
    /// Re-entrant Changed frame: re-evaluate and re-broadcast the metric
    /// without a state change.
    Updated,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NoticeContext {
    notices: [Option<LifecycleNotice>; MAX_NOTICES_PER_FRAME],
}

impl NoticeContext {
    pub(crate) fn emit(&mut self, notice: LifecycleNotice) {
        for slot in &mut self.notices {
            if slot.is_none() {
                *slot = Some(notice);
                return;
            }
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = LifecycleNotice> + '_ {
        self.notices.iter().flatten().copied()
    }
}

/// Owns the state machine for one gesture instance.
pub(crate) struct Lifecycle {
    machine: statig::blocking::StateMachine<GestureHsm>,
}

impl Lifecycle {
    pub(crate) fn new(cancel_policy: CancelPolicy, completion: GestureCompletion) -> Self {
        Self {
            machine: GestureHsm::new(cancel_policy, completion).state_machine(),
        }
    }

    pub(crate) fn handle(&mut self, event: &LifecycleEvent, context: &mut NoticeContext) {
        self.machine.handle_with_context(event, context);
    }
}

struct GestureHsm {
    cancel_policy: CancelPolicy,
    completion: GestureCompletion,
    armed: bool,
}

impl GestureHsm {
    fn new(cancel_policy: CancelPolicy, completion: GestureCompletion) -> Self {
        Self {
            cancel_policy,
            completion,
            armed: false,
        }
    }

    fn announce(&self, context: &mut NoticeContext, state: GestureState) {
        debug!("gesture -> {state:?}");
        context.emit(LifecycleNotice::Entered(state));
    }
}

#[state_machine(initial = "State::possible()")]
impl GestureHsm {
    #[state]
    fn possible(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::TouchesAdded { enough } | LifecycleEvent::TouchesMoved { enough } => {
                if !*enough {
                    return Handled;
                }
                match self.completion {
                    GestureCompletion::Continuous => {
                        self.announce(context, GestureState::Began);
                        Transition(State::began())
                    }
                    GestureCompletion::Discrete => {
                        self.armed = true;
                        Handled
                    }
                }
            }
            LifecycleEvent::TouchesEnded { remaining } => {
                if *remaining > 0 {
                    return Handled;
                }
                if self.armed {
                    self.announce(context, GestureState::Recognized);
                    Transition(State::recognized())
                } else {
                    self.announce(context, GestureState::Failed);
                    Transition(State::failed())
                }
            }
            LifecycleEvent::TouchesCancelled { remaining } => {
                if *remaining > 0 {
                    return Handled;
                }
                // Cancelled input never recognizes, whatever the policy.
                self.armed = false;
                self.announce(context, GestureState::Failed);
                Transition(State::failed())
            }
            LifecycleEvent::Reset => self.resolve_reset(context),
        }
    }

    #[state]
    fn began(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::TouchesMoved { enough } => {
                if *enough {
                    self.announce(context, GestureState::Changed);
                    Transition(State::changed())
                } else {
                    Handled
                }
            }
            LifecycleEvent::TouchesEnded { remaining } => {
                if *remaining == 0 {
                    self.announce(context, GestureState::Ended);
                    Transition(State::ended())
                } else {
                    Handled
                }
            }
            LifecycleEvent::TouchesCancelled { remaining } => {
                if *remaining == 0 {
                    self.resolve_cancel(context)
                } else {
                    Handled
                }
            }
            LifecycleEvent::TouchesAdded { .. } => Handled,
            LifecycleEvent::Reset => self.resolve_reset(context),
        }
    }

    #[state]
    fn changed(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::TouchesMoved { enough } => {
                // Re-entrant: no exit/entry, just a fresh metric emission.
                // A starved frame (cluster lost while touches remain) holds
                // silently instead.
                if *enough {
                    context.emit(LifecycleNotice::Updated);
                }
                Handled
            }
            LifecycleEvent::TouchesEnded { remaining } => {
                if *remaining == 0 {
                    self.announce(context, GestureState::Ended);
                    Transition(State::ended())
                } else {
                    Handled
                }
            }
            LifecycleEvent::TouchesCancelled { remaining } => {
                if *remaining == 0 {
                    self.resolve_cancel(context)
                } else {
                    Handled
                }
            }
            LifecycleEvent::TouchesAdded { .. } => Handled,
            LifecycleEvent::Reset => self.resolve_reset(context),
        }
    }

    #[state]
    fn recognized(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Reset => self.resolve_reset(context),
            _ => Handled,
        }
    }

    #[state]
    fn ended(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Reset => self.resolve_reset(context),
            _ => Handled,
        }
    }

    #[state]
    fn cancelled(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Reset => self.resolve_reset(context),
            _ => Handled,
        }
    }

    #[state]
    fn failed(&mut self, context: &mut NoticeContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Reset => self.resolve_reset(context),
            _ => Handled,
        }
    }
}

impl GestureHsm {
    fn resolve_cancel(&mut self, context: &mut NoticeContext) -> Outcome<State> {
        match self.cancel_policy {
            CancelPolicy::EndGesture => {
                self.announce(context, GestureState::Ended);
                Transition(State::ended())
            }
            CancelPolicy::CancelGesture => {
                self.announce(context, GestureState::Cancelled);
                Transition(State::cancelled())
            }
        }
    }

    fn resolve_reset(&mut self, context: &mut NoticeContext) -> Outcome<State> {
        self.armed = false;
        self.announce(context, GestureState::Possible);
        Transition(State::possible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn continuous() -> Lifecycle {
        Lifecycle::new(CancelPolicy::EndGesture, GestureCompletion::Continuous)
    }

    fn discrete() -> Lifecycle {
        Lifecycle::new(CancelPolicy::EndGesture, GestureCompletion::Discrete)
    }

    fn drive(lifecycle: &mut Lifecycle, event: LifecycleEvent) -> Vec<LifecycleNotice> {
        let mut context = NoticeContext::default();
        lifecycle.handle(&event, &mut context);
        context.iter().collect()
    }

    fn entered(state: GestureState) -> Vec<LifecycleNotice> {
        vec![LifecycleNotice::Entered(state)]
    }

    #[test]
    fn added_with_enough_points_begins() {
        let mut lifecycle = continuous();
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        assert_eq!(notices, entered(GestureState::Began));
    }

    #[test]
    fn added_without_enough_points_holds_possible() {
        let mut lifecycle = continuous();
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: false });
        assert!(notices.is_empty());
    }

    #[test]
    fn movement_can_begin_from_possible() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: false });
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });
        assert_eq!(notices, entered(GestureState::Began));
    }

    #[test]
    fn began_changes_on_movement() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });
        assert_eq!(notices, entered(GestureState::Changed));
    }

    #[test]
    fn changed_re_emits_on_each_qualifying_move() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });

        for _ in 0..3 {
            let notices = drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });
            assert_eq!(notices, vec![LifecycleNotice::Updated]);
        }
    }

    #[test]
    fn starved_movement_mutes_changed() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: false });
        assert!(notices.is_empty());
    }

    #[test]
    fn ending_last_touch_ends_from_changed() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Ended));
    }

    #[test]
    fn partial_release_holds_state() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 1 });
        assert!(notices.is_empty());
    }

    #[test]
    fn cancellation_conflates_with_end_by_default() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesCancelled { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Ended));
    }

    #[test]
    fn cancel_policy_routes_to_cancelled() {
        let mut lifecycle =
            Lifecycle::new(CancelPolicy::CancelGesture, GestureCompletion::Continuous);
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesCancelled { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Cancelled));
    }

    #[test]
    fn exhausted_possible_fails() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: false });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Failed));
    }

    #[test]
    fn cancelled_possible_fails_regardless_of_policy() {
        let mut lifecycle =
            Lifecycle::new(CancelPolicy::CancelGesture, GestureCompletion::Continuous);
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: false });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesCancelled { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Failed));
    }

    #[test]
    fn discrete_release_recognizes_when_armed() {
        let mut lifecycle = discrete();
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        assert!(notices.is_empty());

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Recognized));
    }

    #[test]
    fn discrete_release_fails_when_never_armed() {
        let mut lifecycle = discrete();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: false });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Failed));
    }

    #[test]
    fn discrete_cancel_never_recognizes() {
        let mut lifecycle = discrete();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });

        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesCancelled { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Failed));

        // The arming must not leak into the next session.
        drive(&mut lifecycle, LifecycleEvent::Reset);
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });
        assert_eq!(notices, entered(GestureState::Failed));
    }

    #[test]
    fn terminal_states_ignore_touches() {
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 });

        assert!(drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true }).is_empty());
        assert!(drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true }).is_empty());
        assert!(drive(&mut lifecycle, LifecycleEvent::TouchesEnded { remaining: 0 }).is_empty());
    }

    #[test]
    fn reset_returns_possible_from_any_state() {
        // Mid-gesture.
        let mut lifecycle = continuous();
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesMoved { enough: true });
        let notices = drive(&mut lifecycle, LifecycleEvent::Reset);
        assert_eq!(notices, entered(GestureState::Possible));

        // Terminal.
        drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        drive(&mut lifecycle, LifecycleEvent::TouchesCancelled { remaining: 0 });
        let notices = drive(&mut lifecycle, LifecycleEvent::Reset);
        assert_eq!(notices, entered(GestureState::Possible));

        // Fresh machine.
        let mut fresh = continuous();
        let notices = drive(&mut fresh, LifecycleEvent::Reset);
        assert_eq!(notices, entered(GestureState::Possible));

        // Machine is live again after reset.
        let notices = drive(&mut lifecycle, LifecycleEvent::TouchesAdded { enough: true });
        assert_eq!(notices, entered(GestureState::Began));
    }
}
