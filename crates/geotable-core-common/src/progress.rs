//! Hierarchical progress reporting and cooperative cancellation.
//!
//! A [`ProgressNode`] is a node in a progress tree. A child node created with
//! [`ProgressNode::sub_process`] advances its parent by exactly one step when
//! it completes, and [`ProgressNode::progression`] composes recursively
//! through the active subtree, so every driver reports through the same
//! primitive regardless of how deeply its work is nested.
//!
//! Cancellation is a single shared flag per tree: [`ProgressNode::cancel`]
//! called on any node is immediately visible from every other node of the
//! same tree, ancestors and descendants alike. Long-running loops are
//! expected to poll [`ProgressNode::is_cancelled`] at a bounded cadence (once
//! per row or per batch) rather than on every byte.
//!
//! A fresh root that nobody observes is the inert default for
//! non-interactive callers: all methods work but report to no one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

struct State {
    step_count: u64,
    step: u64,
    finished: bool,
    parent: Weak<Inner>,
    child: Weak<Inner>,
}

struct Inner {
    cancelled: Arc<AtomicBool>,
    state: Mutex<State>,
}

/// A shareable handle on one node of a progress/cancellation tree.
///
/// Cloning the handle does not create a child; both clones address the same
/// node. Use [`ProgressNode::sub_process`] to create children.
#[derive(Clone)]
pub struct ProgressNode {
    inner: Arc<Inner>,
}

impl ProgressNode {
    /// Creates the root of a new progress tree with `step_count` steps.
    #[must_use]
    pub fn new(step_count: u64) -> Self {
        Self::with_flag(step_count, Arc::new(AtomicBool::new(false)), Weak::new())
    }

    fn with_flag(step_count: u64, cancelled: Arc<AtomicBool>, parent: Weak<Inner>) -> Self {
        ProgressNode {
            inner: Arc::new(Inner {
                cancelled,
                state: Mutex::new(State {
                    step_count,
                    step: 0,
                    finished: false,
                    parent,
                    child: Weak::new(),
                }),
            }),
        }
    }

    /// Creates a child node whose own completion counts as exactly one step
    /// of this node.
    ///
    /// The child shares this tree's cancellation flag.
    #[must_use]
    pub fn sub_process(&self, step_count: u64) -> ProgressNode {
        let child = Self::with_flag(
            step_count,
            Arc::clone(&self.inner.cancelled),
            Arc::downgrade(&self.inner),
        );
        let mut state = self.inner.state.lock().unwrap();
        state.child = Arc::downgrade(&child.inner);
        child
    }

    /// Sets the absolute step, clamped to `[current, step_count]`.
    ///
    /// The position never decreases; completing the last step advances the
    /// parent node by one.
    pub fn set_step(&self, step: u64) {
        advance_to(&self.inner, step);
    }

    /// Advances by one step.
    pub fn end_step(&self) {
        let target = {
            let state = self.inner.state.lock().unwrap();
            state.step.saturating_add(1)
        };
        advance_to(&self.inner, target);
    }

    /// Jumps to the last step, completing this node.
    pub fn end_of_progress(&self) {
        let target = {
            let state = self.inner.state.lock().unwrap();
            state.step_count
        };
        advance_to(&self.inner, target);
    }

    /// Overall progression of this node in `[0, 1]`, composed recursively
    /// through the active child.
    #[must_use]
    pub fn progression(&self) -> f64 {
        node_progression(&self.inner).1
    }

    /// Current absolute step.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.inner.state.lock().unwrap().step
    }

    /// Declared number of steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.inner.state.lock().unwrap().step_count
    }

    /// Sets the cancellation flag shared by the whole tree.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether any node of this tree was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for ProgressNode {
    /// An inert single-step root, suitable for callers that do not track
    /// progress.
    fn default() -> Self {
        ProgressNode::new(1)
    }
}

/// Moves the node forward to `target` (clamped, monotonic) and notifies the
/// parent once when the node completes. The lock is released before the
/// parent is touched.
fn advance_to(inner: &Arc<Inner>, target: u64) {
    let parent = {
        let mut state = inner.state.lock().unwrap();
        if state.finished {
            return;
        }
        let clamped = target.min(state.step_count).max(state.step);
        state.step = clamped;
        if clamped < state.step_count {
            return;
        }
        state.finished = true;
        state.parent.upgrade()
    };
    if let Some(parent) = parent {
        let target = {
            let state = parent.state.lock().unwrap();
            state.step.saturating_add(1)
        };
        advance_to(&parent, target);
    }
}

/// Returns `(finished, progression)` for a node, including the contribution
/// of its unfinished active child.
fn node_progression(inner: &Arc<Inner>) -> (bool, f64) {
    let (step, count, finished, child) = {
        let state = inner.state.lock().unwrap();
        (
            state.step,
            state.step_count,
            state.finished,
            state.child.upgrade(),
        )
    };
    if finished {
        return (true, 1.0);
    }
    // A node with zero declared steps has no measurable extent; it renders
    // as complete but still notifies its parent when it actually ends.
    if count == 0 {
        return (false, 1.0);
    }
    let mut fraction = step as f64 / count as f64;
    if let Some(child) = child {
        let (child_finished, child_fraction) = node_progression(&child);
        // A finished child already advanced our step; only an in-flight
        // child contributes fractionally.
        if !child_finished {
            fraction += child_fraction / count as f64;
        }
    }
    (false, fraction.min(1.0))
}
