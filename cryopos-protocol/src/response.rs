//! Response batch framing
//!
//! Response lines are accumulated in a bounded buffer while a command batch
//! executes, then drained to the transport in packet-sized chunks:
//!
//! - remaining data shorter than `packet - 1`: sent with a NUL terminator
//!   appended, which ends the batch
//! - remaining data exactly `packet - 1`: sent alone, followed by a chunk
//!   holding only the NUL terminator
//! - otherwise: one full packet of data, the rest stays queued
//!
//! A line that would not fit is not appended; [`ResponseFramer::push`]
//! returns [`CapacityError`] and the buffer is left untouched.

use core::fmt::Write;

use heapless::Vec;

/// Default response buffer size in bytes
pub const RESPONSE_CAPACITY: usize = 1024;

/// Transport packet payload size in bytes
pub const PACKET_SIZE: usize = 64;

/// Worst-case framing bytes around a message (`X.BAD ` and `\n`)
pub const LINE_OVERHEAD: usize = 7;

/// Outcome word at the start of a response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    Bad,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Bad => "BAD",
        }
    }
}

/// The response buffer has no room left for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    /// Nothing to send
    Idle,
    /// Data (possibly empty) followed by the terminator
    Data,
    /// Only the terminator is left
    Terminator,
}

/// Bounded response accumulator and packet chunker
pub struct ResponseFramer<const N: usize = RESPONSE_CAPACITY> {
    buf: Vec<u8, N>,
    drain: Drain,
}

impl<const N: usize> Default for ResponseFramer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ResponseFramer<N> {
    /// Create an empty framer
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            drain: Drain::Idle,
        }
    }

    /// Append one response line: `[T.]OK[ message]\n` or `[T.]BAD message\n`
    pub fn push(
        &mut self,
        tag: Option<char>,
        status: Status,
        message: &str,
    ) -> Result<(), CapacityError> {
        if self.buf.len() + message.len() + LINE_OVERHEAD >= N {
            return Err(CapacityError);
        }

        let mut line = LineWriter(&mut self.buf);
        if let Some(tag) = tag {
            write!(line, "{}.", tag).map_err(|_| CapacityError)?;
        }
        line.0
            .extend_from_slice(status.as_str().as_bytes())
            .map_err(|_| CapacityError)?;
        if !message.is_empty() {
            line.0.push(b' ').map_err(|_| CapacityError)?;
            line.0
                .extend_from_slice(message.as_bytes())
                .map_err(|_| CapacityError)?;
        }
        line.0.push(b'\n').map_err(|_| CapacityError)?;
        Ok(())
    }

    /// Mark the batch complete; the buffered lines become drainable
    ///
    /// A sealed batch with no lines still produces a lone terminator.
    pub fn seal(&mut self) {
        self.drain = Drain::Data;
    }

    /// Copy the next chunk into `packet`, returning its length
    ///
    /// The packet size is `packet.len()`. Returns `None` once the sealed
    /// batch, including its terminator, has been fully handed out.
    pub fn next_chunk(&mut self, packet: &mut [u8]) -> Option<usize> {
        let size = packet.len();
        if size == 0 {
            return None;
        }

        match self.drain {
            Drain::Idle => None,
            Drain::Terminator => {
                packet[0] = 0;
                self.drain = Drain::Idle;
                Some(1)
            }
            Drain::Data => {
                let len = self.buf.len();
                if len + 1 < size {
                    packet[..len].copy_from_slice(&self.buf);
                    packet[len] = 0;
                    self.buf.clear();
                    self.drain = Drain::Idle;
                    Some(len + 1)
                } else if len + 1 == size {
                    packet[..len].copy_from_slice(&self.buf);
                    self.buf.clear();
                    self.drain = Drain::Terminator;
                    Some(len)
                } else {
                    packet.copy_from_slice(&self.buf[..size]);
                    self.buf.copy_within(size.., 0);
                    self.buf.truncate(len - size);
                    Some(size)
                }
            }
        }
    }

    /// Buffered, not yet drained bytes (without the terminator)
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True while a sealed batch still has chunks to hand out
    pub fn is_draining(&self) -> bool {
        self.drain != Drain::Idle
    }

    /// Drop all buffered data
    pub fn clear(&mut self) {
        self.buf.clear();
        self.drain = Drain::Idle;
    }
}

struct LineWriter<'a, const N: usize>(&'a mut Vec<u8, N>);

impl<const N: usize> Write for LineWriter<'_, N> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0
            .extend_from_slice(s.as_bytes())
            .map_err(|_| core::fmt::Error)
    }
}
