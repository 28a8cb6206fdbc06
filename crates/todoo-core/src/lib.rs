#![cfg_attr(not(test), no_std)]

//! Platform-independent core of the Todoo wearable: schedule store,
//! transfer FIFO, wire decoder and the countdown display pipeline.
//!
//! Everything here is `no_std` and free of hardware types so it can be
//! exercised on the host. Board glue feeds bytes in (wireless writes)
//! and carries bytes out (flash and LCD) through the traits in
//! [`display`].

pub mod display;
pub mod ingest;
pub mod layout;
pub mod schedule;
pub mod transfer;
