//! # Process Group Transport
//!
//! The engine is bulk-synchronous: every mutating operation is collective over
//! a group of processes, each holding a block of rows of the distributed
//! state. The only primitives required of the transport are rank/size
//! introspection and an all-reduce sum on `f64` buffers.

use std::sync::{Arc, Barrier, Mutex};

use anyhow::{anyhow, bail};

/// A group of cooperating processes.
///
/// All members of a group must enter every collective in the same order with
/// buffers of the same length; the reduced result must be identical on every
/// member, bit for bit. A failed collective is fatal to the whole group, so
/// errors returned here are not recoverable.
pub trait ProcessGroup {
    /// Rank of the calling member, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of members in the group.
    fn size(&self) -> usize;

    /// Element-wise sum of `buf` over all members, written back into `buf`
    /// on every member.
    fn all_reduce_sum(&self, buf: &mut [f64]) -> anyhow::Result<()>;
}

/// The single-process group. All-reduce is the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialGroup;

impl ProcessGroup for SerialGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buf: &mut [f64]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// An in-process group of threads sharing one address space.
///
/// Each member hands its contribution to a shared slot, waits at a barrier,
/// and then every member sums the slots in rank order. Summing in a fixed
/// order makes the reduced value bit-identical on all members regardless of
/// thread scheduling, which is the guarantee the replicated small matrices
/// rely on.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    rank: usize,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Option<Vec<f64>>>>,
}

impl ThreadGroup {
    /// Creates the members of a group of `size` threads. Hand one member to
    /// each worker; collectives block until every member arrives.
    pub fn create(size: usize) -> anyhow::Result<Vec<ThreadGroup>> {
        if size == 0 {
            bail!("a process group needs at least one member");
        }
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![None; size]),
        });
        Ok((0..size)
            .map(|rank| ThreadGroup {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }
}

impl ProcessGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce_sum(&self, buf: &mut [f64]) -> anyhow::Result<()> {
        {
            let mut slots = self
                .shared
                .slots
                .lock()
                .map_err(|_| anyhow!("process group poisoned by a failed member"))?;
            slots[self.rank] = Some(buf.to_vec());
        }
        self.shared.barrier.wait();

        {
            let slots = self
                .shared
                .slots
                .lock()
                .map_err(|_| anyhow!("process group poisoned by a failed member"))?;
            buf.iter_mut().for_each(|x| *x = 0.0);
            for (rank, slot) in slots.iter().enumerate() {
                let contribution = slot
                    .as_ref()
                    .ok_or_else(|| anyhow!("member {rank} left the collective early"))?;
                if contribution.len() != buf.len() {
                    bail!(
                        "member {rank} reduced {} values, this member reduced {}",
                        contribution.len(),
                        buf.len()
                    );
                }
                for (acc, x) in buf.iter_mut().zip(contribution) {
                    *acc += *x;
                }
            }
        }
        let leader = self.shared.barrier.wait().is_leader();

        if leader {
            let mut slots = self
                .shared
                .slots
                .lock()
                .map_err(|_| anyhow!("process group poisoned by a failed member"))?;
            slots.iter_mut().for_each(|slot| *slot = None);
        }
        self.shared.barrier.wait();
        Ok(())
    }
}
