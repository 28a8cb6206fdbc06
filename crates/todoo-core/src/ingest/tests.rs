use super::*;
use crate::transfer::CHUNK_BYTES;

type TestFifo = TransferFifo<CHUNK_BYTES, 4>;

fn header_frame(count: u8, picture: &[u8]) -> Vec<u8> {
    // Clock: Wednesday 08:15:30, theme 2.
    let mut frame = vec![2, 8, 15, 30, 2, count];

    for i in 0..count {
        // Monday, one hour starting at 08:00, 10:00, 12:00, ...
        frame.extend_from_slice(&[0, 8 + 2 * i, 0, 9 + 2 * i, 0]);
    }

    frame.extend_from_slice(picture);
    frame
}

#[test]
fn header_with_no_activities_completes_immediately() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo = TestFifo::new();

    let event = receiver
        .on_frame(&header_frame(0, &[]), &mut store, &mut fifo)
        .unwrap();

    assert_eq!(event, Some(IngestEvent::TransferComplete));
    assert_eq!(store.activities().unwrap().len(), 0);
    assert!(fifo.is_empty());
}

#[test]
fn three_activity_transfer_round_trips() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo = TestFifo::new();

    let first_picture = [0xA5u8; 30];
    let event = receiver
        .on_frame(&header_frame(3, &first_picture), &mut store, &mut fifo)
        .unwrap();
    assert_eq!(event, Some(IngestEvent::ScheduleReceived));

    let activities = store.activities().unwrap();
    assert_eq!(activities.len(), 3);
    assert_eq!(store.params().activity_count, 3);
    assert_eq!(store.params().theme, 2);
    assert_eq!(store.params().weekday, 2);

    for (i, activity) in activities.iter().enumerate() {
        assert_eq!(activity.start.hour, 8 + 2 * i as u8);
        assert_eq!(activity.end.hour, 9 + 2 * i as u8);
        assert_eq!(
            activity.pic_addr,
            layout::FIRST_ACTIVITY_PIC + i as u32 * layout::ACTIVITY_PIC_STRIDE
        );
    }

    // Stream the remaining picture bytes, draining like the flash
    // writer would.
    let mut queued = fifo.pop().unwrap().data().to_vec();
    let mut remaining = receiver.picture_bytes_remaining();
    assert_eq!(
        remaining,
        3 * layout::ACTIVITY_PIC_BYTES - first_picture.len() as u32
    );

    let mut last_event = None;
    while remaining > 0 {
        let len = remaining.min(CHUNK_BYTES as u32) as usize;
        let chunk = vec![0x5A; len];

        last_event = receiver.on_frame(&chunk, &mut store, &mut fifo).unwrap();
        queued.extend_from_slice(fifo.pop().unwrap().data());
        remaining = receiver.picture_bytes_remaining();
    }

    assert_eq!(last_event, Some(IngestEvent::TransferComplete));
    assert_eq!(queued.len() as u32, 3 * layout::ACTIVITY_PIC_BYTES);
    assert_eq!(&queued[..30], &first_picture);
}

#[test]
fn malformed_header_leaves_everything_untouched() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo = TestFifo::new();

    // Weekday out of range.
    let mut frame = header_frame(1, &[]);
    frame[4] = 7;
    assert_eq!(
        receiver.on_frame(&frame, &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );

    // Records truncated.
    let frame = &header_frame(2, &[])[..HEADER_BYTES + RECORD_BYTES];
    assert_eq!(
        receiver.on_frame(frame, &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );

    // Start hour out of range.
    let mut frame = header_frame(1, &[]);
    frame[HEADER_BYTES + 1] = 24;
    assert_eq!(
        receiver.on_frame(&frame, &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );

    assert!(store.activities().is_none());
    assert!(fifo.is_empty());
    assert_eq!(receiver.picture_bytes_remaining(), 0);
}

#[test]
fn empty_and_oversized_frames_are_rejected() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo = TestFifo::new();

    assert_eq!(
        receiver.on_frame(&[], &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );
    assert_eq!(
        receiver.on_frame(&[0; FRAME_BYTES + 1], &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );
}

#[test]
fn full_fifo_rejects_the_packet_for_retry() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo: TransferFifo<CHUNK_BYTES, 1> = TransferFifo::new();

    receiver
        .on_frame(&header_frame(1, &[]), &mut store, &mut fifo)
        .unwrap();
    assert_eq!(
        receiver.picture_bytes_remaining(),
        layout::ACTIVITY_PIC_BYTES
    );

    fifo.push(&[0; CHUNK_BYTES]).unwrap();

    let chunk = [0x5A; CHUNK_BYTES];
    assert_eq!(
        receiver.on_frame(&chunk, &mut store, &mut fifo),
        Err(IngestError::Backpressure)
    );
    assert_eq!(
        receiver.picture_bytes_remaining(),
        layout::ACTIVITY_PIC_BYTES
    );

    // Retry verbatim once the flash writer made room.
    fifo.pop();
    assert_eq!(receiver.on_frame(&chunk, &mut store, &mut fifo), Ok(None));
    assert_eq!(
        receiver.picture_bytes_remaining(),
        layout::ACTIVITY_PIC_BYTES - CHUNK_BYTES as u32
    );
}

#[test]
fn picture_overrun_is_malformed() {
    let mut receiver = ScheduleReceiver::new();
    let mut store = ScheduleStore::new();
    let mut fifo = TestFifo::new();

    receiver
        .on_frame(&header_frame(1, &[]), &mut store, &mut fifo)
        .unwrap();

    // Drain down to a final partial chunk.
    while receiver.picture_bytes_remaining() > CHUNK_BYTES as u32 {
        let len = (receiver.picture_bytes_remaining() - 72).min(CHUNK_BYTES as u32) as usize;
        receiver
            .on_frame(&vec![0; len], &mut store, &mut fifo)
            .unwrap();
        fifo.pop();
    }

    let remaining = receiver.picture_bytes_remaining();
    assert!(remaining > 0 && remaining < CHUNK_BYTES as u32);

    assert_eq!(
        receiver.on_frame(&[0; CHUNK_BYTES], &mut store, &mut fifo),
        Err(IngestError::Malformed)
    );
}
