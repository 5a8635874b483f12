// THEORY:
// The `FrontierPriorityStack` holds every candidate edge the traversal could
// take next, keyed by a small integer cost. The traversal pops the cheapest one
// on every step, so extraction of the minimum has to be constant time.
//
// Key architectural principles:
// 1.  **Bucket per Priority**: Costs are bounded (at most 3 * 128 for RGB, 255 for
//     palette indices), so each possible cost gets its own vector. Pushing is an
//     append, popping is a `Vec::pop`, and entries of equal cost come back
//     most-recent-first.
// 2.  **Linked Non-Empty Buckets**: Only non-empty buckets are threaded onto an
//     ordered doubly linked list, so the head of that list is always the cheapest
//     populated bucket. A bucket is linked exactly when its vector is non-empty.
// 3.  **Arena Links**: The links live in a side table indexed by bucket number and
//     refer to other buckets by index. There are no pointers between nodes, so
//     there is nothing to dangle when vectors grow.
// 4.  **Bounded Backward Scan**: Linking a newly populated bucket walks down from
//     `priority - 1` to the nearest populated bucket. That walk is bounded by the
//     priority range, not by the number of entries.

/// Doubly linked list node for one bucket, stored by bucket index.
#[derive(Debug, Clone, Copy, Default)]
struct BucketLink {
    prev: Option<usize>,
    next: Option<usize>,
}

/// Min-priority stack over a small, fixed range of integer priorities.
#[derive(Debug, Clone)]
pub struct FrontierPriorityStack<T> {
    /// One LIFO vector per priority level.
    buckets: Vec<Vec<T>>,
    /// Ordered links between non-empty buckets.
    links: Vec<BucketLink>,
    /// Lowest non-empty bucket.
    head: Option<usize>,
    /// Total number of queued entries.
    len: usize,
}

impl<T> FrontierPriorityStack<T> {
    /// Creates a stack accepting priorities `0..num_buckets`.
    pub fn new(num_buckets: usize) -> Self {
        let num_buckets = num_buckets.max(1);
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, Vec::new);
        Self {
            buckets,
            links: vec![BucketLink::default(); num_buckets],
            head: None,
            len: 0,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Queues `entry` at `priority`.
    ///
    /// Callers size the stack so that every priority they can produce is below
    /// `num_buckets`. Debug builds panic on a priority outside that range;
    /// release builds file it in the top bucket.
    pub fn push(&mut self, entry: T, priority: u32) {
        debug_assert!(
            (priority as usize) < self.buckets.len(),
            "priority {} outside {} buckets",
            priority,
            self.buckets.len()
        );
        let bucket = (priority as usize).min(self.buckets.len() - 1);
        self.buckets[bucket].push(entry);
        self.len += 1;
        if self.buckets[bucket].len() == 1 {
            self.link(bucket);
        }
    }

    /// Removes the most recently pushed entry of the lowest priority.
    pub fn pop_min(&mut self) -> Option<(T, u32)> {
        let bucket = self.head?;
        let entry = self.buckets[bucket].pop()?;
        self.len -= 1;
        if self.buckets[bucket].is_empty() {
            self.unlink(bucket);
        }
        Some((entry, bucket as u32))
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.links.fill(BucketLink::default());
        self.head = None;
        self.len = 0;
    }

    /// Priorities of the linked buckets, lowest first.
    pub fn linked_priorities(&self) -> Vec<u32> {
        let mut priorities = Vec::new();
        let mut cursor = self.head;
        while let Some(bucket) = cursor {
            priorities.push(bucket as u32);
            cursor = self.links[bucket].next;
        }
        priorities
    }

    fn link(&mut self, bucket: usize) {
        match self.head {
            None => {
                self.links[bucket] = BucketLink::default();
                self.head = Some(bucket);
            }
            Some(head) if head > bucket => self.insert_before(head, bucket),
            Some(_) => {
                // The head bucket is populated and lower, so this walk stops.
                let mut below = bucket - 1;
                while self.buckets[below].is_empty() {
                    below -= 1;
                }
                self.insert_after(below, bucket);
            }
        }
    }

    fn insert_before(&mut self, existing: usize, bucket: usize) {
        let prev = self.links[existing].prev;
        self.links[bucket] = BucketLink {
            prev,
            next: Some(existing),
        };
        match prev {
            Some(p) => self.links[p].next = Some(bucket),
            None => self.head = Some(bucket),
        }
        self.links[existing].prev = Some(bucket);
    }

    fn insert_after(&mut self, existing: usize, bucket: usize) {
        let next = self.links[existing].next;
        self.links[bucket] = BucketLink {
            prev: Some(existing),
            next,
        };
        self.links[existing].next = Some(bucket);
        if let Some(n) = next {
            self.links[n].prev = Some(bucket);
        }
    }

    fn unlink(&mut self, bucket: usize) {
        let BucketLink { prev, next } = self.links[bucket];
        match prev {
            Some(p) => self.links[p].next = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.links[n].prev = prev;
        }
        self.links[bucket] = BucketLink::default();
    }
}
