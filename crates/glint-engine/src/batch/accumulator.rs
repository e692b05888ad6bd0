/// Fixed-capacity buffer of interleaved per-instance floats.
///
/// Allocated once at `capacity * stride` and never resized. Writers fill one
/// instance at a time with [`Accumulator::push`]; the owner flushes when
/// [`Accumulator::is_full`] (or its own, lower limit) is reached, so a write
/// past the end is structurally impossible.
#[derive(Debug, Clone)]
pub struct Accumulator {
    /// `capacity * stride` floats, reused across batches.
    data: Vec<f32>,
    /// Floats per instance.
    stride: usize,
    /// Instances written since the last clear.
    count: usize,
    /// Instances that fit in `data`.
    capacity: usize,
}

impl Accumulator {
    pub fn new(stride: usize, capacity: usize) -> Self {
        assert!(stride > 0 && capacity > 0, "accumulator needs a stride and a capacity");
        Self { data: vec![0.0; stride * capacity], stride, count: 0, capacity }
    }

    /// Floats per instance.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Instances written since the last clear.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Hands out the next instance slot and advances the cursor.
    ///
    /// The caller must write the whole slot; stale data from a previous batch
    /// is not cleared.
    pub fn push(&mut self) -> &mut [f32] {
        debug_assert!(!self.is_full(), "accumulator written past capacity");
        let start = self.count * self.stride;
        self.count += 1;
        &mut self.data[start..start + self.stride]
    }

    /// Copies one instance.
    pub fn push_slice(&mut self, instance: &[f32]) {
        debug_assert_eq!(instance.len(), self.stride);
        self.push().copy_from_slice(instance);
    }

    /// The written range: exactly `len() * stride()` floats.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.count * self.stride]
    }

    #[inline]
    pub fn clear(&mut self) {
        self.count = 0;
    }
}
