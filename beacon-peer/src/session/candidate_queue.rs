use beacon_core::IceCandidate;
use std::collections::VecDeque;

/// Holds remote ICE candidates until the remote description is installed.
///
/// A candidate is applied exactly once: either immediately (remote description
/// already set) or when the queue is drained, in arrival order.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
    remote_applied: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote_applied(&self) -> bool {
        self.remote_applied
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the candidate back when it can be applied right away.
    pub fn admit(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_applied {
            Some(candidate)
        } else {
            self.pending.push_back(candidate);
            None
        }
    }

    /// Flips the queue to pass-through and hands out everything held so far.
    pub fn mark_remote_applied(&mut self) -> Vec<IceCandidate> {
        self.remote_applied = true;
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.remote_applied = false;
    }
}
