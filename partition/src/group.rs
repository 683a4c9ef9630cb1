//! Host simulation of one data-parallel execution group.
//!
//! Every lane is an OS thread, all of them live for the whole launch, and
//! `Lane::sync` is a group-wide barrier. Shared memory is any `Sync` state the
//! kernel closure borrows, typically [`SharedBuffer`]s owned by the caller.
//!
//! Lanes cannot run on a work-stealing pool: a barrier needs every lane of the
//! group to be scheduled at once, which a pool smaller than the group would
//! never do.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Condvar, Mutex};

/// Upper bound on lanes per group.
pub const MAX_LANES: usize = 1024;

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Fixed-size group of lanes that run one kernel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionGroup {
    lanes: usize,
}

impl ExecutionGroup {
    /// # Panics
    /// Panics if `lanes` is 0 or above [`MAX_LANES`].
    pub fn new(lanes: usize) -> Self {
        assert!(
            lanes > 0 && lanes <= MAX_LANES,
            "lanes must be in 1..={MAX_LANES}, got {lanes}"
        );
        Self { lanes }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Runs `kernel` once per lane, all lanes concurrently.
    ///
    /// Returns after every lane has returned. Every lane must execute the same
    /// sequence of [`Lane::sync`] calls, otherwise the group never finishes.
    ///
    /// # Panics
    /// If a lane panics, the group is aborted: lanes blocked in or arriving
    /// at [`Lane::sync`] unwind instead of waiting. Once all lanes have
    /// stopped, the panic of the lowest failing lane is re-raised.
    pub fn launch<F>(&self, kernel: F)
    where
        F: Fn(&Lane<'_>) + Sync,
    {
        let barrier = GroupBarrier::new(self.lanes);
        let kernel = &kernel;

        let failures: Vec<PanicPayload> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.lanes)
                .map(|id| {
                    let lane = Lane {
                        id,
                        group_size: self.lanes,
                        barrier: &barrier,
                    };
                    scope.spawn(move || {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| kernel(&lane)));
                        if result.is_err() {
                            lane.barrier.abort();
                        }
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(payload)) | Err(payload) => Some(payload),
                })
                .collect()
        });

        // Lanes released by an abort carry a marker, not the failure itself.
        if let Some(payload) = failures
            .into_iter()
            .find(|payload| !payload.is::<GroupAborted>())
        {
            panic::resume_unwind(payload);
        }
    }
}

/// Unwind payload of lanes released from a barrier because another lane
/// panicked.
#[derive(Debug)]
struct GroupAborted;

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

/// Reusable barrier that can be broken when a lane fails.
#[derive(Debug)]
struct GroupBarrier {
    lanes: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl GroupBarrier {
    fn new(lanes: usize) -> Self {
        Self {
            lanes,
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    /// Blocks until all lanes arrive; returns `true` on the last one.
    /// Unwinds with [`GroupAborted`] if the group has been aborted.
    fn wait(&self) -> bool {
        let mut state = self.state.lock();
        if state.aborted {
            drop(state);
            panic::resume_unwind(Box::new(GroupAborted));
        }

        state.arrived += 1;
        if state.arrived == self.lanes {
            state.arrived = 0;
            state.generation += 1;
            self.released.notify_all();
            return true;
        }

        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            self.released.wait(&mut state);
        }
        if state.generation == generation {
            drop(state);
            panic::resume_unwind(Box::new(GroupAborted));
        }
        false
    }

    fn abort(&self) {
        self.state.lock().aborted = true;
        self.released.notify_all();
    }
}

/// Handle a kernel receives for the lane it runs on.
#[derive(Debug)]
pub struct Lane<'a> {
    id: usize,
    group_size: usize,
    barrier: &'a GroupBarrier,
}

impl Lane<'_> {
    /// Index of this lane within its group, `0..group_size()`.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Waits until every lane of the group reaches this point.
    ///
    /// All writes made by any lane before the barrier are visible to every
    /// lane after it. Returns `true` for exactly one lane per barrier.
    ///
    /// # Panics
    /// Unwinds if another lane of the group has panicked.
    #[inline]
    pub fn sync(&self) -> bool {
        self.barrier.wait()
    }
}

/// Fixed-length array of words shared by all lanes of a launch.
pub struct SharedBuffer {
    cells: Box<[AtomicU32]>,
}

impl SharedBuffer {
    pub fn new(len: usize) -> Self {
        Self::filled(len, 0)
    }

    pub fn filled(len: usize, value: u32) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU32::new(value)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The underlying atomic, for read-modify-write helpers.
    #[inline]
    pub fn cell(&self, idx: usize) -> &AtomicU32 {
        &self.cells[idx]
    }

    #[inline]
    pub fn load(&self, idx: usize) -> u32 {
        self.cells[idx].load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, idx: usize, value: u32) {
        self.cells[idx].store(value, Ordering::Release);
    }

    /// Copies the current contents out. Only meaningful once no lane is
    /// writing, i.e. after the launch or after a barrier.
    pub fn to_vec(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Acquire))
            .collect()
    }
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.cells.len())
            .finish()
    }
}
