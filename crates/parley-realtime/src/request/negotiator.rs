//! Request negotiator: validates, stores, and resolves pending chat requests.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use parley_core::types::{Identity, RequestId};

use super::model::{ChatRequest, RequestState};
use crate::error::ChatError;
use crate::presence::status::PresenceState;
use crate::presence::tracker::PresenceTracker;

/// Requests removed because one of their parties changed availability.
#[derive(Debug, Default)]
pub struct DrainedRequests {
    /// Requests the user had sent; their targets hold stale offers.
    pub outgoing: Vec<ChatRequest>,
    /// Requests the user had received; their requesters await an answer.
    pub incoming: Vec<ChatRequest>,
}

impl DrainedRequests {
    /// Whether nothing was drained.
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

/// Owns every pending request.
///
/// At most one request is pending per ordered `(requester, target)` pair.
#[derive(Debug)]
pub struct RequestNegotiator {
    pending: HashMap<RequestId, ChatRequest>,
    by_pair: HashMap<(Identity, Identity), RequestId>,
    timeout: Duration,
}

impl RequestNegotiator {
    /// Create a negotiator whose requests expire after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            by_pair: HashMap::new(),
            timeout,
        }
    }

    /// Configured request window.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate and store a new pending request.
    ///
    /// `arm` is called with the new id and returns the request's timeout
    /// timer; it is only called once every check has passed.
    pub fn submit(
        &mut self,
        requester: &Identity,
        target: &str,
        presence: &PresenceTracker,
        arm: impl FnOnce(RequestId) -> CancellationToken,
    ) -> Result<ChatRequest, ChatError> {
        let target = Identity::parse(target)
            .map_err(|_| ChatError::InvalidTarget(target.to_string()))?;
        if &target == requester {
            return Err(ChatError::InvalidTarget(target.to_string()));
        }

        match presence.state(&target) {
            None => return Err(ChatError::InvalidTarget(target.to_string())),
            Some(PresenceState::Busy) => return Err(ChatError::TargetBusy(target)),
            Some(PresenceState::Offline) => return Err(ChatError::TargetOffline(target)),
            Some(PresenceState::Idle) => {}
        }

        if !presence.is_idle(requester) {
            return Err(ChatError::RequesterBusy);
        }

        let pair = (requester.clone(), target.clone());
        if self.by_pair.contains_key(&pair) {
            return Err(ChatError::DuplicateRequest(target));
        }

        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|window| created_at.checked_add_signed(window))
            .ok_or(ChatError::TimeoutOutOfRange(self.timeout))?;
        let mut request = ChatRequest::new(requester.clone(), target, created_at, expires_at);
        request.arm(arm(request.id));

        tracing::info!(
            request_id = %request.id,
            requester = %request.requester,
            target = %request.target,
            "Chat request submitted"
        );

        self.by_pair.insert(pair, request.id);
        self.pending.insert(request.id, request.clone());
        Ok(request)
    }

    /// Accept or reject a request. Only its target may do this.
    ///
    /// A second answer to the same request fails with `StaleRequest`.
    pub fn resolve(
        &mut self,
        responder: &Identity,
        id: RequestId,
        accepted: bool,
    ) -> Result<ChatRequest, ChatError> {
        let request = self.pending.get(&id).ok_or(ChatError::StaleRequest(id))?;
        if &request.target != responder {
            return Err(ChatError::NotRequestTarget(id));
        }

        let state = if accepted {
            RequestState::Accepted
        } else {
            RequestState::Rejected
        };
        self.remove(id, state).ok_or(ChatError::StaleRequest(id))
    }

    /// Withdraw a request. Only its requester may do this.
    pub fn cancel(&mut self, requester: &Identity, id: RequestId) -> Result<ChatRequest, ChatError> {
        let request = self.pending.get(&id).ok_or(ChatError::StaleRequest(id))?;
        if &request.requester != requester {
            return Err(ChatError::NotRequester(id));
        }
        self.remove(id, RequestState::Cancelled)
            .ok_or(ChatError::StaleRequest(id))
    }

    /// Timer callback. Returns `None` if the request was already resolved.
    pub fn expire(&mut self, id: RequestId) -> Option<ChatRequest> {
        self.remove(id, RequestState::Expired)
    }

    /// Remove every pending request `identity` takes part in.
    pub fn drain_involving(&mut self, identity: &Identity) -> DrainedRequests {
        let mut ids: Vec<(RequestId, bool)> = self
            .pending
            .values()
            .filter_map(|r| {
                if &r.requester == identity {
                    Some((r.id, true))
                } else if &r.target == identity {
                    Some((r.id, false))
                } else {
                    None
                }
            })
            .collect();
        ids.sort_by_key(|(id, _)| self.pending.get(id).map(|r| r.created_at));

        let mut drained = DrainedRequests::default();
        for (id, outgoing) in ids {
            if outgoing {
                drained
                    .outgoing
                    .extend(self.remove(id, RequestState::Cancelled));
            } else {
                drained
                    .incoming
                    .extend(self.remove(id, RequestState::Rejected));
            }
        }
        drained
    }

    /// Pending requests addressed to `identity`, oldest first.
    pub fn incoming_for(&self, identity: &Identity) -> Vec<&ChatRequest> {
        let mut incoming: Vec<&ChatRequest> = self
            .pending
            .values()
            .filter(|r| &r.target == identity)
            .collect();
        incoming.sort_by_key(|r| r.created_at);
        incoming
    }

    /// Look up a pending request.
    pub fn get(&self, id: RequestId) -> Option<&ChatRequest> {
        self.pending.get(&id)
    }

    /// Pending request for the ordered pair, if any.
    pub fn pending_between(&self, requester: &Identity, target: &Identity) -> Option<&ChatRequest> {
        self.by_pair
            .get(&(requester.clone(), target.clone()))
            .and_then(|id| self.pending.get(id))
    }

    /// Every pending request.
    pub fn iter(&self) -> impl Iterator<Item = &ChatRequest> {
        self.pending.values()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Cancel every timer and forget every request.
    pub fn clear(&mut self) {
        for (_, request) in self.pending.drain() {
            request.finish(RequestState::Cancelled);
        }
        self.by_pair.clear();
    }

    /// Checks that the pair index and the request table agree.
    pub fn check_index(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.by_pair.len() != self.pending.len() {
            problems.push(format!(
                "{} pending requests but {} indexed pairs",
                self.pending.len(),
                self.by_pair.len()
            ));
        }
        for request in self.pending.values() {
            let key = (request.requester.clone(), request.target.clone());
            if self.by_pair.get(&key) != Some(&request.id) {
                problems.push(format!(
                    "request {} ({} -> {}) missing from pair index",
                    request.id, request.requester, request.target
                ));
            }
            if !request.is_pending() {
                problems.push(format!("request {} stored in state {:?}", request.id, request.state));
            }
        }
        problems
    }

    fn remove(&mut self, id: RequestId, state: RequestState) -> Option<ChatRequest> {
        let request = self.pending.remove(&id)?;
        self.by_pair
            .remove(&(request.requester.clone(), request.target.clone()));
        let request = request.finish(state);
        tracing::debug!(request_id = %id, state = ?state, "Chat request resolved");
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::parse(name).expect("valid")
    }

    fn online(names: &[&str]) -> PresenceTracker {
        let mut presence = PresenceTracker::new();
        for name in names {
            presence.come_online(&id(name)).expect("online");
        }
        presence
    }

    fn negotiator() -> RequestNegotiator {
        RequestNegotiator::new(Duration::from_secs(30))
    }

    fn no_timer(_: RequestId) -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn test_unrepresentable_timeout_is_rejected_without_arming() {
        let presence = online(&["alice", "bob"]);
        let mut n = RequestNegotiator::new(Duration::from_secs(10_000_000_000_000));
        let mut armed = false;

        let err = n
            .submit(&id("alice"), "bob", &presence, |_| {
                armed = true;
                CancellationToken::new()
            })
            .unwrap_err();

        assert!(matches!(err, ChatError::TimeoutOutOfRange(_)));
        assert!(!armed);
        assert!(n.is_empty());
    }

    #[test]
    fn test_expiry_matches_configured_window() {
        let presence = online(&["alice", "bob"]);
        let mut n = RequestNegotiator::new(Duration::from_secs(45));

        let request = n.submit(&id("alice"), "bob", &presence, no_timer).expect("submitted");

        assert_eq!(request.expires_at - request.created_at, chrono::Duration::seconds(45));
    }

    #[test]
    fn test_submit_validates_target() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();

        assert!(matches!(
            n.submit(&id("alice"), "alice", &presence, no_timer),
            Err(ChatError::InvalidTarget(_))
        ));
        assert!(matches!(
            n.submit(&id("alice"), "nobody", &presence, no_timer),
            Err(ChatError::InvalidTarget(_))
        ));
        assert!(matches!(
            n.submit(&id("alice"), "", &presence, no_timer),
            Err(ChatError::InvalidTarget(_))
        ));
        assert!(n.is_empty());
    }

    #[test]
    fn test_busy_and_offline_targets_create_nothing() {
        let mut presence = online(&["alice", "bob", "carol"]);
        presence.mark_busy(&id("bob")).expect("busy");
        presence.mark_offline(&id("carol")).expect("offline");
        let mut n = negotiator();
        let mut armed = false;

        let err = n
            .submit(&id("alice"), "bob", &presence, |_| {
                armed = true;
                CancellationToken::new()
            })
            .unwrap_err();
        assert_eq!(err, ChatError::TargetBusy(id("bob")));
        assert!(!armed);

        assert_eq!(
            n.submit(&id("alice"), "carol", &presence, no_timer).unwrap_err(),
            ChatError::TargetOffline(id("carol"))
        );
        assert!(n.is_empty());
    }

    #[test]
    fn test_busy_requester_is_rejected() {
        let mut presence = online(&["alice", "bob"]);
        presence.mark_busy(&id("alice")).expect("busy");
        let mut n = negotiator();

        assert_eq!(
            n.submit(&id("alice"), "bob", &presence, no_timer).unwrap_err(),
            ChatError::RequesterBusy
        );
    }

    #[test]
    fn test_one_pending_request_per_ordered_pair() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();

        n.submit(&id("alice"), "bob", &presence, no_timer).expect("first");
        assert_eq!(
            n.submit(&id("alice"), "bob", &presence, no_timer).unwrap_err(),
            ChatError::DuplicateRequest(id("bob"))
        );
        n.submit(&id("bob"), "alice", &presence, no_timer)
            .expect("reverse direction is a different pair");
        assert_eq!(n.len(), 2);
        assert!(n.check_index().is_empty());
    }

    #[test]
    fn test_resolve_applies_once() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();
        let request = n.submit(&id("alice"), "bob", &presence, no_timer).expect("submit");

        assert_eq!(
            n.resolve(&id("alice"), request.id, true).unwrap_err(),
            ChatError::NotRequestTarget(request.id)
        );
        let resolved = n.resolve(&id("bob"), request.id, true).expect("accept");
        assert_eq!(resolved.state, RequestState::Accepted);
        assert_eq!(
            n.resolve(&id("bob"), request.id, true).unwrap_err(),
            ChatError::StaleRequest(request.id)
        );
        assert!(n.pending_between(&id("alice"), &id("bob")).is_none());
    }

    #[test]
    fn test_resolution_cancels_timer() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();
        let timer = CancellationToken::new();
        let request = n
            .submit(&id("alice"), "bob", &presence, |_| timer.clone())
            .expect("submit");

        n.resolve(&id("bob"), request.id, false).expect("reject");
        assert!(timer.is_cancelled());
        assert!(n.expire(request.id).is_none());
    }

    #[test]
    fn test_cancel_only_by_requester() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();
        let request = n.submit(&id("alice"), "bob", &presence, no_timer).expect("submit");

        assert_eq!(
            n.cancel(&id("bob"), request.id).unwrap_err(),
            ChatError::NotRequester(request.id)
        );
        let cancelled = n.cancel(&id("alice"), request.id).expect("cancel");
        assert_eq!(cancelled.state, RequestState::Cancelled);
        assert_eq!(
            n.cancel(&id("alice"), request.id).unwrap_err(),
            ChatError::StaleRequest(request.id)
        );
    }

    #[test]
    fn test_expiry_frees_the_pair() {
        let presence = online(&["alice", "bob"]);
        let mut n = negotiator();
        let request = n.submit(&id("alice"), "bob", &presence, no_timer).expect("submit");

        let expired = n.expire(request.id).expect("expired");
        assert_eq!(expired.state, RequestState::Expired);
        n.submit(&id("alice"), "bob", &presence, no_timer)
            .expect("pair is free again");
    }

    #[test]
    fn test_drain_splits_by_direction() {
        let presence = online(&["alice", "bob", "carol", "dan"]);
        let mut n = negotiator();
        n.submit(&id("alice"), "bob", &presence, no_timer).expect("a->b");
        n.submit(&id("carol"), "alice", &presence, no_timer).expect("c->a");
        n.submit(&id("carol"), "dan", &presence, no_timer).expect("c->d");

        let drained = n.drain_involving(&id("alice"));
        assert_eq!(drained.outgoing.len(), 1);
        assert_eq!(drained.outgoing[0].target, id("bob"));
        assert_eq!(drained.incoming.len(), 1);
        assert_eq!(drained.incoming[0].requester, id("carol"));
        assert_eq!(n.len(), 1);
        assert!(n.check_index().is_empty());
    }

    #[test]
    fn test_incoming_for_lists_offers() {
        let presence = online(&["alice", "bob", "carol"]);
        let mut n = negotiator();
        n.submit(&id("alice"), "carol", &presence, no_timer).expect("a->c");
        n.submit(&id("bob"), "carol", &presence, no_timer).expect("b->c");

        let incoming = n.incoming_for(&id("carol"));
        assert_eq!(incoming.len(), 2);
        assert!(n.incoming_for(&id("alice")).is_empty());
    }
}
