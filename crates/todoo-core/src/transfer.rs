//! Bounded chunk FIFO between the wireless write path and the flash writer.
//!
//! Single producer (the schedule receiver) and single consumer (the
//! flash writer task). Slots are fixed width; the logical length of the
//! final chunk of a picture may be shorter than the slot.

/// Bytes carried per chunk. Matches the wireless write payload size.
pub const CHUNK_BYTES: usize = 128;
/// Number of chunk slots held while the flash writer catches up.
pub const FIFO_DEPTH: usize = 80;

/// Transfer FIFO with the production dimensions.
pub type TransferQueue = TransferFifo<CHUNK_BYTES, FIFO_DEPTH>;

/// FIFO errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FifoError {
    /// All slots are occupied; the producer must back off.
    Full,
}

/// One fixed-width slot with its logical payload length.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<const W: usize> {
    bytes: [u8; W],
    len: usize,
}

impl<const W: usize> Chunk<W> {
    const EMPTY: Self = Self {
        bytes: [0; W],
        len: 0,
    };

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Logical payload length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bounded FIFO over `H` slots of width `W`.
pub struct TransferFifo<const W: usize, const H: usize> {
    slots: [Chunk<W>; H],
    read: usize,
    write: usize,
    count: usize,
}

impl<const W: usize, const H: usize> TransferFifo<W, H> {
    pub const fn new() -> Self {
        Self {
            slots: [Chunk::EMPTY; H],
            read: 0,
            write: 0,
            count: 0,
        }
    }

    /// Enqueues one chunk. Rejects the chunk when no slot is free; the
    /// stored sequence is never reordered or overwritten.
    pub fn push(&mut self, data: &[u8]) -> Result<(), FifoError> {
        debug_assert!(data.len() <= W);

        if self.count == H {
            return Err(FifoError::Full);
        }

        let slot = &mut self.slots[self.write];
        slot.bytes[..data.len()].copy_from_slice(data);
        slot.len = data.len();

        self.write = (self.write + 1) % H;
        self.count += 1;

        Ok(())
    }

    /// Dequeues the oldest chunk, if any.
    pub fn pop(&mut self) -> Option<Chunk<W>> {
        if self.count == 0 {
            return None;
        }

        let chunk = self.slots[self.read];
        self.read = (self.read + 1) % H;
        self.count -= 1;

        Some(chunk)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == H
    }

    pub const fn capacity(&self) -> usize {
        H
    }
}

impl<const W: usize, const H: usize> Default for TransferFifo<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_come_out_in_arrival_order() {
        let mut fifo: TransferFifo<8, 4> = TransferFifo::new();

        for i in 0..4u8 {
            fifo.push(&[i; 8]).unwrap();
        }

        for i in 0..4u8 {
            assert_eq!(fifo.pop().unwrap().data(), &[i; 8]);
        }

        assert!(fifo.pop().is_none());
    }

    #[test]
    fn full_fifo_rejects_without_disturbing_contents() {
        let mut fifo: TransferFifo<8, 4> = TransferFifo::new();

        for i in 0..4u8 {
            fifo.push(&[i; 8]).unwrap();
        }

        assert!(fifo.is_full());
        assert_eq!(fifo.push(&[9; 8]), Err(FifoError::Full));

        assert_eq!(fifo.pop().unwrap().data(), &[0; 8]);
        assert_eq!(fifo.len(), 3);
    }

    #[test]
    fn short_final_chunk_keeps_its_logical_length() {
        let mut fifo: TransferFifo<8, 4> = TransferFifo::new();

        fifo.push(&[1, 2, 3]).unwrap();

        let chunk = fifo.pop().unwrap();
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.data(), &[1, 2, 3]);
    }

    #[test]
    fn wraparound_reuses_freed_slots() {
        let mut fifo: TransferFifo<4, 2> = TransferFifo::new();

        fifo.push(&[1]).unwrap();
        fifo.push(&[2]).unwrap();
        assert_eq!(fifo.pop().unwrap().data(), &[1]);

        fifo.push(&[3]).unwrap();
        assert_eq!(fifo.pop().unwrap().data(), &[2]);
        assert_eq!(fifo.pop().unwrap().data(), &[3]);
        assert!(fifo.is_empty());
    }
}
