use parking_lot::Mutex;

/// One sample per minute over a day.
pub const DEFAULT_CAPACITY: usize = 1440;

/// Fixed-capacity ring of price samples.
///
/// Guarantees:
/// - At most `capacity` samples are ever considered; once full, `add`
///   overwrites the oldest slot.
/// - Readers and writers are serialized by one lock, so `median` never sees a
///   slot mid-overwrite.
/// - `median` sorts a private copy; the live storage keeps arrival order.
pub struct PriceSampleBuffer {
    inner: Mutex<Ring>,
}

struct Ring {
    slots: Vec<f64>,
    /// Index the next sample is written to.
    next: usize,
    /// Number of valid slots, saturates at `slots.len()`.
    len: usize,
}

impl PriceSampleBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                slots: vec![0.0; capacity],
                next: 0,
                len: 0,
            }),
        }
    }

    pub fn add(&self, sample: f64) {
        let mut ring = self.inner.lock();
        let cap = ring.slots.len();
        let idx = ring.next;

        ring.slots[idx] = sample;
        ring.next = (idx + 1) % cap;
        if ring.len < cap {
            ring.len += 1;
        }
    }

    /// Median of the samples currently held, `None` while empty.
    pub fn median(&self) -> Option<f64> {
        let mut values = self.snapshot();
        if values.is_empty() {
            return None;
        }

        values.sort_by(|a, b| a.total_cmp(b));

        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[mid])
        } else {
            Some((values[mid - 1] + values[mid]) / 2.0)
        }
    }

    /// Most recently added sample.
    pub fn latest(&self) -> Option<f64> {
        let ring = self.inner.lock();
        if ring.len == 0 {
            return None;
        }
        let cap = ring.slots.len();
        Some(ring.slots[(ring.next + cap - 1) % cap])
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Copies the valid samples, oldest first.
    fn snapshot(&self) -> Vec<f64> {
        let ring = self.inner.lock();
        let cap = ring.slots.len();

        if ring.len < cap {
            return ring.slots[..ring.len].to_vec();
        }

        let mut out = Vec::with_capacity(cap);
        out.extend_from_slice(&ring.slots[ring.next..]);
        out.extend_from_slice(&ring.slots[..ring.next]);
        out
    }
}

impl Default for PriceSampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
