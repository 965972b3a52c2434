//! Cryopos command protocol
//!
//! The host talks to the controller with short text commands packed into
//! fixed-size transport packets. A packet carries a batch of command lines;
//! the controller answers with one response line per command.
//!
//! # Protocol Overview
//!
//! ```text
//! request:   [T.]command [arg]...  ( ';' | '\n' ) ...   NUL padding
//! response:  [T.]OK[ message]\n
//!            [T.]BAD message\n      ...                  NUL
//! ```
//!
//! `T` is an optional one-character tag echoed back on the matching
//! response line. The response batch is sent in packet-sized chunks, see
//! [`ResponseFramer`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod batch;
pub mod fmt;
pub mod response;

pub use batch::{Args, Batch, CommandLine, LineError, MAX_LINE_LEN};
pub use fmt::Sig6;
pub use response::{
    CapacityError, ResponseFramer, Status, LINE_OVERHEAD, PACKET_SIZE, RESPONSE_CAPACITY,
};
