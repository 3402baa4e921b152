//! Integer bucket priority queue.
//!
//! Elements are indices `0..capacity` with a non-negative integer cost in
//! `0..=max_cost`, or [`INFINITE_COST`] for elements that have not been
//! reached yet. Each bucket is a doubly linked list threaded through flat
//! `next`/`prev` arrays, which gives O(1) insertion, removal and
//! decrease-key without any per-element allocation.

/// Cost of an element that no path has reached.
pub const INFINITE_COST: u32 = u32::MAX;

/// Largest cost bound a queue can be created with.
///
/// The queue allocates one bucket per finite cost, so the bound caps the
/// bucket arrays at 256 MiB.
pub const MAX_COST_BOUND: u32 = 1 << 24;

const NIL: usize = usize::MAX;

/// Errors raised by the bucket queue.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum QueueError {
    /// A finite cost larger than the configured bound was inserted.
    #[error("cost {cost} exceeds the queue bound {max_cost}")]
    CostOutOfRange {
        /// offending cost
        cost: u32,
        /// configured bound
        max_cost: u32,
    },

    /// The requested cost bound is above [`MAX_COST_BOUND`].
    #[error("queue bound {0} is above the supported maximum {1}")]
    BoundTooLarge(u32, u32),

    /// The element index is not below the queue capacity.
    #[error("element {0} is out of bounds (capacity {1})")]
    ElementOutOfBounds(usize, usize),

    /// The element is already waiting in a bucket.
    #[error("element {0} is already queued")]
    AlreadyQueued(usize),
}

/// Lifecycle of an element in the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    /// Never inserted, or removed without being popped.
    #[default]
    Unvisited,
    /// Waiting in a bucket.
    Frontier,
    /// Popped by [`BucketQueue::pop_min`].
    Finalized,
}

/// Order in which elements of the same bucket leave the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// First inserted, first popped.
    #[default]
    Fifo,
    /// Last inserted, first popped.
    Lifo,
}

/// Parameters of a [`BucketQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Largest finite cost accepted by the queue.
    pub max_cost: u32,
    /// Number of elements, indexed `0..capacity`.
    pub capacity: usize,
    /// Order among elements with equal cost.
    pub tie_break: TieBreak,
}

impl QueueConfig {
    /// FIFO configuration for the given bound and capacity.
    pub fn new(max_cost: u32, capacity: usize) -> Self {
        Self {
            max_cost,
            capacity,
            tie_break: TieBreak::default(),
        }
    }
}

/// Priority queue over a bounded range of integer costs.
///
/// # Examples
///
/// ```
/// use ift_imgproc::queue::{BucketQueue, INFINITE_COST};
///
/// let mut queue = BucketQueue::new(10, 4).unwrap();
/// queue.insert(0, 7).unwrap();
/// queue.insert(1, INFINITE_COST).unwrap();
/// queue.insert(2, 3).unwrap();
/// queue.insert(3, 3).unwrap();
///
/// assert_eq!(queue.pop_min(), Some(2));
/// assert_eq!(queue.pop_min(), Some(3));
/// assert_eq!(queue.pop_min(), Some(0));
/// assert_eq!(queue.pop_min(), Some(1));
/// assert_eq!(queue.pop_min(), None);
/// ```
#[derive(Clone, Debug)]
pub struct BucketQueue {
    first: Vec<usize>,
    last: Vec<usize>,
    next: Vec<usize>,
    prev: Vec<usize>,
    bucket: Vec<usize>,
    state: Vec<NodeState>,
    // no finite bucket below this index holds an element
    lowest: usize,
    len: usize,
    max_cost: u32,
    tie_break: TieBreak,
}

impl BucketQueue {
    /// Create a FIFO queue accepting costs `0..=max_cost` for `capacity` elements.
    ///
    /// # Errors
    ///
    /// Fails if `max_cost` is above [`MAX_COST_BOUND`].
    pub fn new(max_cost: u32, capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(QueueConfig::new(max_cost, capacity))
    }

    /// Create a queue from a full configuration.
    ///
    /// # Errors
    ///
    /// Fails if `config.max_cost` is above [`MAX_COST_BOUND`].
    pub fn with_config(config: QueueConfig) -> Result<Self, QueueError> {
        if config.max_cost > MAX_COST_BOUND {
            return Err(QueueError::BoundTooLarge(config.max_cost, MAX_COST_BOUND));
        }

        // one bucket per finite cost plus the bucket of unreached elements
        let num_buckets = config.max_cost as usize + 2;
        Ok(Self {
            first: vec![NIL; num_buckets],
            last: vec![NIL; num_buckets],
            next: vec![NIL; config.capacity],
            prev: vec![NIL; config.capacity],
            bucket: vec![NIL; config.capacity],
            state: vec![NodeState::Unvisited; config.capacity],
            lowest: 0,
            len: 0,
            max_cost: config.max_cost,
            tie_break: config.tie_break,
        })
    }

    /// Largest finite cost accepted by the queue.
    pub fn max_cost(&self) -> u32 {
        self.max_cost
    }

    /// Number of addressable elements.
    pub fn capacity(&self) -> usize {
        self.state.len()
    }

    /// Number of elements currently waiting in a bucket.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no element is waiting.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lifecycle state of element `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not below the capacity.
    pub fn state(&self, p: usize) -> NodeState {
        self.state[p]
    }

    fn infinite_bucket(&self) -> usize {
        self.max_cost as usize + 1
    }

    fn check_index(&self, p: usize) -> Result<(), QueueError> {
        if p >= self.capacity() {
            return Err(QueueError::ElementOutOfBounds(p, self.capacity()));
        }
        Ok(())
    }

    fn bucket_of(&self, cost: u32) -> Result<usize, QueueError> {
        if cost == INFINITE_COST {
            Ok(self.infinite_bucket())
        } else if cost > self.max_cost {
            Err(QueueError::CostOutOfRange {
                cost,
                max_cost: self.max_cost,
            })
        } else {
            Ok(cost as usize)
        }
    }

    /// Insert element `p` into the bucket of `cost`.
    ///
    /// # Errors
    ///
    /// Fails if `p` is out of bounds, already queued, or if `cost` is finite
    /// and larger than [`BucketQueue::max_cost`].
    pub fn insert(&mut self, p: usize, cost: u32) -> Result<(), QueueError> {
        self.check_index(p)?;
        if self.state[p] == NodeState::Frontier {
            return Err(QueueError::AlreadyQueued(p));
        }
        let b = self.bucket_of(cost)?;

        if self.first[b] == NIL {
            self.first[b] = p;
            self.last[b] = p;
            self.next[p] = NIL;
            self.prev[p] = NIL;
        } else {
            match self.tie_break {
                TieBreak::Fifo => {
                    let tail = self.last[b];
                    self.next[tail] = p;
                    self.prev[p] = tail;
                    self.next[p] = NIL;
                    self.last[b] = p;
                }
                TieBreak::Lifo => {
                    let head = self.first[b];
                    self.prev[head] = p;
                    self.next[p] = head;
                    self.prev[p] = NIL;
                    self.first[b] = p;
                }
            }
        }

        self.bucket[p] = b;
        self.state[p] = NodeState::Frontier;
        self.len += 1;
        if b < self.lowest {
            self.lowest = b;
        }
        Ok(())
    }

    fn unlink(&mut self, p: usize) {
        let b = self.bucket[p];
        let (prev, next) = (self.prev[p], self.next[p]);

        if prev == NIL {
            self.first[b] = next;
        } else {
            self.next[prev] = next;
        }
        if next == NIL {
            self.last[b] = prev;
        } else {
            self.prev[next] = prev;
        }

        self.next[p] = NIL;
        self.prev[p] = NIL;
        self.bucket[p] = NIL;
        self.len -= 1;
    }

    /// Pop the first element of the lowest non-empty bucket and finalize it.
    ///
    /// Unreached elements (inserted with [`INFINITE_COST`]) come out only once
    /// every finite bucket is empty.
    pub fn pop_min(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }

        let infinite = self.infinite_bucket();
        while self.lowest < infinite && self.first[self.lowest] == NIL {
            self.lowest += 1;
        }

        let b = if self.lowest < infinite {
            self.lowest
        } else {
            infinite
        };
        let p = self.first[b];
        if p == NIL {
            return None;
        }

        self.unlink(p);
        self.state[p] = NodeState::Finalized;
        Some(p)
    }

    /// Detach a waiting element from its bucket without finalizing it.
    ///
    /// Returns `false` if the element was not waiting.
    pub fn remove(&mut self, p: usize) -> Result<bool, QueueError> {
        self.check_index(p)?;
        if self.state[p] != NodeState::Frontier {
            return Ok(false);
        }
        self.unlink(p);
        self.state[p] = NodeState::Unvisited;
        Ok(true)
    }

    /// Move element `p` to the bucket of `cost`.
    ///
    /// A waiting element is detached and reinserted, an unvisited one is
    /// inserted. Finalized elements are left untouched and `false` is returned.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`BucketQueue::insert`]; the element
    /// keeps its previous bucket in that case.
    pub fn decrease_key(&mut self, p: usize, cost: u32) -> Result<bool, QueueError> {
        self.check_index(p)?;
        if self.state[p] == NodeState::Finalized {
            return Ok(false);
        }
        self.bucket_of(cost)?;
        self.remove(p)?;
        self.insert(p, cost)?;
        Ok(true)
    }

    /// Empty every bucket and mark all elements unvisited, keeping the allocations.
    pub fn reset(&mut self) {
        self.first.fill(NIL);
        self.last.fill(NIL);
        self.next.fill(NIL);
        self.prev.fill(NIL);
        self.bucket.fill(NIL);
        self.state.fill(NodeState::Unvisited);
        self.lowest = 0;
        self.len = 0;
    }
}
