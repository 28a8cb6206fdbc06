//! Wire decoder for the schedule-transfer characteristic.
//!
//! A transfer is one header packet followed by raw picture packets:
//!
//! - header: `[theme] [hour] [minute] [second] [weekday] [count]`,
//!   then `count` records of `[weekday] [start h] [start m] [end h]
//!   [end m]`, then optionally the first picture bytes,
//! - continuation: up to [`transfer::CHUNK_BYTES`] raw picture bytes,
//!   `count * 16200` of them in total, one picture per activity in
//!   sequence order.
//!
//! The decoder validates before it mutates: a malformed packet leaves
//! the store and FIFO exactly as they were, and a packet that does not
//! fit the FIFO is rejected whole so the peer can resend it.

use log::{debug, warn};

use crate::layout;
use crate::schedule::{ScheduleParams, ScheduleStore, TimeOfDay};
use crate::transfer::TransferFifo;

/// Largest packet a peer may write.
pub const FRAME_BYTES: usize = 128;

const HEADER_BYTES: usize = 6;
const RECORD_BYTES: usize = 5;

/// Decoder errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IngestError {
    /// Packet violates the framing or carries out-of-range fields.
    Malformed,
    /// The transfer FIFO has no room; the packet was not consumed.
    Backpressure,
}

/// Pipeline notifications handed to the display task.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IngestEvent {
    /// A header packet was accepted; picture data is on its way.
    ScheduleReceived,
    /// The final picture byte was queued for the flash writer.
    TransferComplete,
}

struct Header {
    params: ScheduleParams,
    records_end: usize,
}

fn parse_time(hour: u8, minute: u8, second: u8) -> Result<TimeOfDay, IngestError> {
    TimeOfDay::new(hour, minute, second).ok_or(IngestError::Malformed)
}

fn parse_header(frame: &[u8]) -> Result<Header, IngestError> {
    if frame.len() < HEADER_BYTES {
        return Err(IngestError::Malformed);
    }

    let weekday = frame[4];
    if weekday >= 7 {
        return Err(IngestError::Malformed);
    }

    let params = ScheduleParams {
        theme: frame[0],
        transition: 0,
        weekday,
        time: parse_time(frame[1], frame[2], frame[3])?,
        activity_count: frame[5],
    };

    let records_end = HEADER_BYTES + usize::from(params.activity_count) * RECORD_BYTES;
    if frame.len() < records_end {
        return Err(IngestError::Malformed);
    }

    // Validate every record up front so a bad packet mutates nothing.
    for record in frame[HEADER_BYTES..records_end].chunks_exact(RECORD_BYTES) {
        if record[0] >= 7 {
            return Err(IngestError::Malformed);
        }
        parse_time(record[1], record[2], 0)?;
        parse_time(record[3], record[4], 0)?;
    }

    Ok(Header {
        params,
        records_end,
    })
}

/// Streaming decoder state for one schedule transfer.
pub struct ScheduleReceiver {
    awaiting_header: bool,
    picture_bytes_remaining: u32,
}

impl ScheduleReceiver {
    pub const fn new() -> Self {
        Self {
            awaiting_header: true,
            picture_bytes_remaining: 0,
        }
    }

    /// Picture bytes still expected before the transfer completes.
    pub fn picture_bytes_remaining(&self) -> u32 {
        self.picture_bytes_remaining
    }

    /// Consumes one characteristic write.
    ///
    /// Returns the pipeline event the packet produced, if any. On
    /// [`IngestError::Backpressure`] the packet was not consumed and
    /// may be retried verbatim once the flash writer catches up.
    pub fn on_frame<const W: usize, const H: usize>(
        &mut self,
        frame: &[u8],
        store: &mut ScheduleStore,
        fifo: &mut TransferFifo<W, H>,
    ) -> Result<Option<IngestEvent>, IngestError> {
        if frame.is_empty() || frame.len() > FRAME_BYTES {
            return Err(IngestError::Malformed);
        }

        if self.awaiting_header {
            self.on_header(frame, store, fifo)
        } else {
            self.on_picture_chunk(frame, fifo)
        }
    }

    fn on_header<const W: usize, const H: usize>(
        &mut self,
        frame: &[u8],
        store: &mut ScheduleStore,
        fifo: &mut TransferFifo<W, H>,
    ) -> Result<Option<IngestEvent>, IngestError> {
        let header = parse_header(frame)?;
        let count = header.params.activity_count;
        let expected = u32::from(count) * layout::ACTIVITY_PIC_BYTES;

        let picture = &frame[header.records_end..];
        if picture.len() as u32 > expected {
            return Err(IngestError::Malformed);
        }
        if !picture.is_empty() && fifo.is_full() {
            return Err(IngestError::Backpressure);
        }

        store.begin_schedule(header.params);
        for (index, record) in frame[HEADER_BYTES..header.records_end]
            .chunks_exact(RECORD_BYTES)
            .enumerate()
        {
            let start = parse_time(record[1], record[2], 0)?;
            let end = parse_time(record[3], record[4], 0)?;
            store
                .set_activity(index, record[0], start, end)
                .map_err(|_| IngestError::Malformed)?;
        }
        store.publish().map_err(|_| IngestError::Malformed)?;

        self.picture_bytes_remaining = expected;
        if !picture.is_empty() {
            // Room was checked above; a full FIFO cannot surface here.
            let _ = fifo.push(picture);
            self.picture_bytes_remaining -= picture.len() as u32;
        }

        debug!(
            "schedule header: {} activities, {} picture bytes to follow",
            count, self.picture_bytes_remaining
        );

        if self.picture_bytes_remaining == 0 {
            self.awaiting_header = true;
            return Ok(Some(IngestEvent::TransferComplete));
        }

        self.awaiting_header = false;
        Ok(Some(IngestEvent::ScheduleReceived))
    }

    fn on_picture_chunk<const W: usize, const H: usize>(
        &mut self,
        frame: &[u8],
        fifo: &mut TransferFifo<W, H>,
    ) -> Result<Option<IngestEvent>, IngestError> {
        if frame.len() as u32 > self.picture_bytes_remaining {
            warn!(
                "picture overrun: got {} bytes, expected at most {}",
                frame.len(),
                self.picture_bytes_remaining
            );
            return Err(IngestError::Malformed);
        }

        if fifo.is_full() {
            return Err(IngestError::Backpressure);
        }

        let _ = fifo.push(frame);
        self.picture_bytes_remaining -= frame.len() as u32;

        if self.picture_bytes_remaining == 0 {
            self.awaiting_header = true;
            return Ok(Some(IngestEvent::TransferComplete));
        }

        Ok(None)
    }
}

impl Default for ScheduleReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
