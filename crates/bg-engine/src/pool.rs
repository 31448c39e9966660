//! Recycling of graph units between voices.

use heapless::Vec as StackVec;

use crate::graph::{AudioContext, FilterType, ParamId, UnitKey, UnitKind};

/// Maximum units kept per kind.
pub const POOL_SIZE: usize = 50;

/// Center frequency a released filter returns with.
pub const POOLED_FILTER_FREQUENCY: f64 = 1000.0;

/// Counters for pool traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Units handed out that had to be created
    pub created: u64,
    /// Units handed out from a stack
    pub reused: u64,
    /// Released units removed instead of kept (stack full or reset failed)
    pub dropped: u64,
}

/// Per-kind stacks of idle, reset, disconnected units.
///
/// Only gains, filters, shapers, compressors and panners are kept.
/// Scheduled sources can start once and are always created fresh; other
/// kinds are removed from the graph on release.
///
/// Single-owner: the pool lives next to the context it feeds and is only
/// touched from the thread that builds voices.
pub struct ResourcePool {
    stacks: [StackVec<UnitKey, POOL_SIZE>; 5],
    stats: PoolStats,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    pub fn new() -> Self {
        Self {
            stacks: Default::default(),
            stats: PoolStats::default(),
        }
    }

    fn slot(kind: UnitKind) -> Option<usize> {
        match kind {
            UnitKind::Gain => Some(0),
            UnitKind::BiquadFilter => Some(1),
            UnitKind::WaveShaper => Some(2),
            UnitKind::DynamicsCompressor => Some(3),
            UnitKind::StereoPanner => Some(4),
            _ => None,
        }
    }

    /// Whether released units of `kind` are kept for reuse.
    pub fn is_pooled(kind: UnitKind) -> bool {
        Self::slot(kind).is_some()
    }

    /// A reset, disconnected unit of `kind`, reused if one is idle.
    pub fn acquire(&mut self, ctx: &mut AudioContext, kind: UnitKind) -> UnitKey {
        if let Some(stack) = Self::slot(kind).map(|i| &mut self.stacks[i]) {
            while let Some(key) = stack.pop() {
                if ctx.contains(key) {
                    self.stats.reused += 1;
                    return key;
                }
            }
        }
        self.stats.created += 1;
        ctx.create(kind)
    }

    /// Return a unit. It is reset to pooled defaults and cut loose from
    /// the graph, then kept if its stack has room. Sources are ignored.
    pub fn release(&mut self, ctx: &mut AudioContext, key: UnitKey) {
        let kind = match ctx.kind(key) {
            Ok(kind) => kind,
            Err(_) => {
                log::debug!("released unit is already gone");
                return;
            }
        };
        if kind.is_source() {
            return;
        }
        let Some(slot) = Self::slot(kind) else {
            self.discard(ctx, key);
            return;
        };
        if self.stacks[slot].is_full() {
            self.stats.dropped += 1;
            self.discard(ctx, key);
            return;
        }
        if let Err(e) = Self::restore(ctx, key, kind) {
            log::debug!("pool reset failed for {:?}: {}", kind, e);
            self.stats.dropped += 1;
            self.discard(ctx, key);
            return;
        }
        if self.stacks[slot].push(key).is_err() {
            self.stats.dropped += 1;
            self.discard(ctx, key);
        }
    }

    fn restore(ctx: &mut AudioContext, key: UnitKey, kind: UnitKind) -> Result<(), crate::EngineError> {
        ctx.reset_unit(key)?;
        if kind == UnitKind::BiquadFilter {
            ctx.set_filter_type(key, FilterType::Lowpass)?;
            ctx.set_param(key, ParamId::Frequency, POOLED_FILTER_FREQUENCY)?;
            ctx.set_param(key, ParamId::Q, 1.0)?;
            ctx.set_param(key, ParamId::FilterGain, 0.0)?;
        }
        ctx.isolate(key)
    }

    fn discard(&mut self, ctx: &mut AudioContext, key: UnitKey) {
        if let Err(e) = ctx.remove(key) {
            log::debug!("discarding unit failed: {}", e);
        }
    }

    /// Idle units held for `kind`.
    pub fn idle(&self, kind: UnitKind) -> usize {
        Self::slot(kind).map_or(0, |i| self.stacks[i].len())
    }

    /// Idle units across all kinds.
    pub fn total_idle(&self) -> usize {
        self.stacks.iter().map(|s| s.len()).sum()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Remove every idle unit from the graph.
    pub fn clear(&mut self, ctx: &mut AudioContext) {
        for stack in &mut self.stacks {
            while let Some(key) = stack.pop() {
                if let Err(e) = ctx.remove(key) {
                    log::debug!("clearing pooled unit failed: {}", e);
                }
            }
        }
    }
}
