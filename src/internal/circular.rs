//! Circular dependency detection infrastructure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::Gate;

pub(crate) const MAX_DEPTH: usize = 1024;

static NEXT_RESOLUTION: AtomicU64 = AtomicU64::new(1);

/// Keys currently under construction on one resolution path.
///
/// Each frame owns its own copy; a child frame is produced by [`push`](Self::push)
/// so concurrent resolutions never share a stack. Every frame of one
/// top-level resolution carries the same resolution id.
#[derive(Debug, Clone)]
pub(crate) struct ResolutionStack {
    resolution: u64,
    keys: Vec<Key>,
}

impl ResolutionStack {
    pub(crate) fn new() -> Self {
        Self {
            resolution: NEXT_RESOLUTION.fetch_add(1, Ordering::Relaxed),
            keys: Vec::new(),
        }
    }

    /// Returns the child stack with `key` on top.
    ///
    /// Fails with the full cycle path when `key` is already being built, or
    /// when the path grows past [`MAX_DEPTH`].
    pub(crate) fn push(&self, key: &Key) -> DiResult<ResolutionStack> {
        // Circular detection BEFORE pushing the new key
        if self.keys.iter().any(|k| k == key) {
            let mut path = self.keys.clone();
            path.push(key.clone());
            return Err(DiError::CircularDependency(path));
        }

        if self.keys.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(self.keys.len()));
        }

        let mut keys = Vec::with_capacity(self.keys.len() + 1);
        keys.extend_from_slice(&self.keys);
        keys.push(key.clone());
        Ok(ResolutionStack {
            resolution: self.resolution,
            keys,
        })
    }

    /// The key currently being built.
    pub(crate) fn last(&self) -> Option<&Key> {
        self.keys.last()
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Keys below the top frame: what was being built when the top failed.
    pub(crate) fn building(&self) -> Vec<Key> {
        match self.keys.split_last() {
            Some((_, rest)) => rest.to_vec(),
            None => Vec::new(),
        }
    }
}

struct Holder {
    resolution: u64,
    key: Key,
}

struct Waiter {
    resolution: u64,
    gate: usize,
    path: Vec<Key>,
}

/// Holders of and waiters on shared-binding construction gates, across every
/// thread resolving through one container.
///
/// Before waiting on a held gate, a resolution follows the chain holder,
/// gate that holder waits on, its holder, and so on. Reaching a key further
/// up its own path means the wait could never end; the cycle is reported
/// instead.
#[derive(Default)]
pub(crate) struct GateGraph {
    holders: HashMap<usize, Holder>,
    waiters: Vec<Waiter>,
}

impl GateGraph {
    fn hold(&mut self, gate: usize, frame: &ResolutionStack) {
        if let Some(key) = frame.last() {
            self.holders.insert(
                gate,
                Holder {
                    resolution: frame.resolution,
                    key: key.clone(),
                },
            );
        }
    }

    fn release(&mut self, gate: usize) {
        self.holders.remove(&gate);
    }

    fn wait(&mut self, gate: usize, frame: &ResolutionStack) -> DiResult<()> {
        if let Some(path) = self.cycle_through(gate, frame) {
            return Err(DiError::CircularDependency(path));
        }
        self.waiters.push(Waiter {
            resolution: frame.resolution,
            gate,
            path: frame.keys.clone(),
        });
        Ok(())
    }

    fn stop_waiting(&mut self, gate: usize, resolution: u64) {
        if let Some(index) = self
            .waiters
            .iter()
            .position(|w| w.gate == gate && w.resolution == resolution)
        {
            self.waiters.swap_remove(index);
        }
    }

    /// Path from `frame` through the chain of waits back onto itself.
    fn cycle_through(&self, gate: usize, frame: &ResolutionStack) -> Option<Vec<Key>> {
        let below = frame.building();
        let mut path = frame.keys.clone();
        let mut gate = gate;

        for _ in 0..=self.waiters.len() {
            let holder = self.holders.get(&gate)?;
            if holder.resolution == frame.resolution {
                // A sibling branch of the same resolution finishes on its own.
                return below.contains(&holder.key).then(|| path);
            }
            let waiter = self
                .waiters
                .iter()
                .find(|w| w.resolution == holder.resolution && w.path.contains(&holder.key))?;
            let from = waiter
                .path
                .iter()
                .position(|k| k == &holder.key)
                .map_or(0, |i| i + 1);
            path.extend_from_slice(&waiter.path[from..]);
            gate = waiter.gate;
        }
        None
    }
}

fn gate_id(gate: &Gate) -> usize {
    Arc::as_ptr(gate) as usize
}

/// Exclusive hold on a construction gate; releases its graph entry first.
pub(crate) struct GatePermit<'g> {
    graph: &'g Mutex<GateGraph>,
    gate: usize,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.graph.lock().release(self.gate);
    }
}

struct Waiting<'g> {
    graph: &'g Mutex<GateGraph>,
    gate: usize,
    resolution: u64,
    done: bool,
}

impl<'g> Waiting<'g> {
    fn into_permit(mut self, frame: &ResolutionStack, permit: OwnedMutexGuard<()>) -> GatePermit<'g> {
        let mut graph = self.graph.lock();
        graph.stop_waiting(self.gate, self.resolution);
        graph.hold(self.gate, frame);
        drop(graph);
        self.done = true;
        GatePermit {
            graph: self.graph,
            gate: self.gate,
            _permit: permit,
        }
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.graph.lock().stop_waiting(self.gate, self.resolution);
        }
    }
}

/// Takes `gate` for the key on top of `frame`, waiting for its holder
/// unless that wait would close a cycle across resolutions.
pub(crate) async fn enter_gate<'g>(
    graph: &'g Mutex<GateGraph>,
    gate: &Gate,
    frame: &ResolutionStack,
) -> DiResult<GatePermit<'g>> {
    let id = gate_id(gate);
    let waiting = {
        let mut state = graph.lock();
        if let Ok(permit) = gate.clone().try_lock_owned() {
            state.hold(id, frame);
            return Ok(GatePermit {
                graph,
                gate: id,
                _permit: permit,
            });
        }
        state.wait(id, frame)?;
        Waiting {
            graph,
            gate: id,
            resolution: frame.resolution,
            done: false,
        }
    };

    let permit = gate.clone().lock_owned().await;
    Ok(waiting.into_permit(frame, permit))
}
