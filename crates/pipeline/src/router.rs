//! Agent router — the two-hop dispatch state machine.
//!
//! Every send runs through at most two attempts: a routing pass under the
//! initially selected agent, and one dispatched pass under the hand-off
//! target. The ceiling is structural: [`Attempt`] has only two inhabitants,
//! and [`DispatchState::next_hop`] at the second attempt returns the
//! routing-loop error instead of a third state.

use chrono::{DateTime, Utc};

use denkitsu_core::error::{Error, Result};
use denkitsu_core::turn::{ConversationTurn, RoutingInfo};

/// Which of the two allowed attempts a call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Second,
}

/// Per-send dispatch state. Created fresh for each user-initiated send,
/// regenerate, or audio submission and discarded when the call resolves.
#[derive(Debug, Clone)]
pub struct DispatchState {
    /// The transcript snapshot this call works from. The display transcript
    /// may continue to mutate concurrently from streaming.
    pub history: Vec<ConversationTurn>,

    /// The agent issuing this particular call.
    pub agent_for_call: String,

    pub attempt: Attempt,

    /// Carried forward so the final persisted turn records the hand-off.
    pub routing_info: Option<RoutingInfo>,

    /// Timestamp of the user turn to remove if this send fails. `None` for
    /// regenerate, which added no user turn.
    pub rollback_timestamp: Option<DateTime<Utc>>,
}

impl DispatchState {
    /// Open a dispatch at the first attempt.
    pub fn opening(
        history: Vec<ConversationTurn>,
        agent: impl Into<String>,
        rollback_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            history,
            agent_for_call: agent.into(),
            attempt: Attempt::First,
            routing_info: None,
            rollback_timestamp,
        }
    }

    /// Consume the single allowed hop, re-targeting the dispatch at `target`.
    ///
    /// A hop requested at the second attempt is the loop-guard trip: fatal
    /// for this operation, no further request may be issued. A self-hop
    /// (target equal to the current agent) still consumes the hop.
    pub fn next_hop(self, target: impl Into<String>) -> Result<Self> {
        match self.attempt {
            Attempt::First => {
                let target = target.into();
                Ok(Self {
                    history: self.history,
                    agent_for_call: target.clone(),
                    attempt: Attempt::Second,
                    routing_info: Some(RoutingInfo { routed_to: target }),
                    rollback_timestamp: self.rollback_timestamp,
                })
            }
            Attempt::Second => Err(Error::RoutingLoop {
                agent: self.agent_for_call,
            }),
        }
    }

    /// Whether this call must be atomic rather than streamed.
    ///
    /// The routing pass is never streamed — its only meaningful output is a
    /// structured hand-off decision. A dispatched pass whose target is the
    /// triage persona itself is another routing pass and stays atomic too,
    /// which is the one way a second hand-off directive can be observed.
    pub fn is_routing_pass(&self, router_agent: &str) -> bool {
        self.attempt == Attempt::First || self.agent_for_call == router_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_state_is_first_attempt_without_routing_info() {
        let state = DispatchState::opening(Vec::new(), "Roteador", None);
        assert_eq!(state.attempt, Attempt::First);
        assert!(state.routing_info.is_none());
        assert!(state.is_routing_pass("Roteador"));
    }

    #[test]
    fn hop_moves_to_second_attempt_and_records_target() {
        let state = DispatchState::opening(Vec::new(), "Roteador", None);
        let hopped = state.next_hop("Coder").unwrap();

        assert_eq!(hopped.attempt, Attempt::Second);
        assert_eq!(hopped.agent_for_call, "Coder");
        assert_eq!(hopped.routing_info.unwrap().routed_to, "Coder");
    }

    #[test]
    fn second_hop_is_the_loop_guard() {
        let state = DispatchState::opening(Vec::new(), "Roteador", None);
        let hopped = state.next_hop("Coder").unwrap();
        let err = hopped.next_hop("Writer").unwrap_err();

        assert!(matches!(err, Error::RoutingLoop { agent } if agent == "Coder"));
    }

    #[test]
    fn self_hop_consumes_the_allowed_hop() {
        let state = DispatchState::opening(Vec::new(), "Roteador", None);
        let hopped = state.next_hop("Roteador").unwrap();

        assert_eq!(hopped.attempt, Attempt::Second);
        assert!(hopped.next_hop("Roteador").is_err());
    }

    #[test]
    fn dispatched_pass_streams_unless_target_is_the_router() {
        let state = DispatchState::opening(Vec::new(), "Roteador", None);

        let to_coder = state.clone().next_hop("Coder").unwrap();
        assert!(!to_coder.is_routing_pass("Roteador"));

        let to_router = state.next_hop("Roteador").unwrap();
        assert!(to_router.is_routing_pass("Roteador"));
    }

    #[test]
    fn rollback_timestamp_survives_the_hop() {
        let ts = Utc::now();
        let state = DispatchState::opening(Vec::new(), "Roteador", Some(ts));
        let hopped = state.next_hop("Coder").unwrap();
        assert_eq!(hopped.rollback_timestamp, Some(ts));
    }
}
