/// Monotonic source of chunk ids for one ingestion run.
///
/// Ids must be unique within a collection; reusing one overwrites the stored chunk. Runs that
/// write to the same collection concurrently should start from disjoint ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIdCounter {
    next: u64,
    issued: u64,
}

impl ChunkIdCounter {
    /// Counter starting at zero.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter whose first id is `start`.
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next: start,
            issued: 0,
        }
    }

    /// Take the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        self.issued += 1;
        id
    }

    /// Id the next call to [`Self::next_id`] returns.
    pub const fn peek(&self) -> u64 {
        self.next
    }

    /// Number of ids handed out so far.
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for ChunkIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
