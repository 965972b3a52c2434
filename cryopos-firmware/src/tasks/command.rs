//! Command task
//!
//! Receives command batches as 64-byte HID output reports, runs them
//! through the dispatcher and answers with the framed response, one input
//! report per chunk. Every report is sent full size, padded with NULs.
//!
//! The first batch arms the watchdog; every batch after that feeds it.

use cryopos_core::command::Dispatcher;
use cryopos_hal_rp2040::{SignalPin, StepControl};
use cryopos_protocol::{ResponseFramer, PACKET_SIZE};
use defmt::*;
use embassy_usb::class::hid::{HidReader, HidReaderWriter, HidWriter, ReadError};

use crate::board::Board;
use crate::tasks::usb::UsbDriver;

/// Dispatcher as wired on this board
pub type BoardDispatcher = Dispatcher<'static, StepControl, SignalPin, Board>;

/// HID interface carrying command and response reports
pub type CommandHid = HidReaderWriter<'static, UsbDriver, PACKET_SIZE, PACKET_SIZE>;

#[embassy_executor::task]
pub async fn command_task(mut dispatcher: BoardDispatcher, hid: CommandHid) {
    info!("Command task started");

    let (mut reader, mut writer) = hid.split();
    let mut framer: ResponseFramer = ResponseFramer::new();
    let mut request = [0u8; PACKET_SIZE];
    let mut armed = false;

    loop {
        let Some(len) = receive(&mut reader, &mut request).await else {
            continue;
        };

        if armed {
            dispatcher.board_mut().feed_watchdog();
        } else {
            dispatcher.board_mut().arm_watchdog();
            armed = true;
        }

        framer.clear();
        let report = dispatcher.execute(&request[..len], &mut framer);
        trace!(
            "Batch: {} commands, {} response bytes",
            report.executed,
            framer.len()
        );
        if report.dropped > 0 {
            warn!("Response buffer full, dropped {} lines", report.dropped);
        }

        respond(&mut writer, &mut framer).await;
    }
}

/// Wait for the next command report
async fn receive(
    reader: &mut HidReader<'static, UsbDriver, PACKET_SIZE>,
    buf: &mut [u8],
) -> Option<usize> {
    match reader.read(buf).await {
        Ok(len) => Some(len),
        Err(ReadError::Disabled) => {
            debug!("HID interface disabled, waiting for host");
            reader.ready().await;
            None
        }
        Err(e) => {
            warn!("HID read error: {:?}", Debug2Format(&e));
            None
        }
    }
}

/// Send the sealed response batch, one full-size report per chunk
async fn respond(
    writer: &mut HidWriter<'static, UsbDriver, PACKET_SIZE>,
    framer: &mut ResponseFramer,
) {
    let mut packet = [0u8; PACKET_SIZE];

    while let Some(len) = framer.next_chunk(&mut packet) {
        packet[len..].fill(0);
        if let Err(e) = writer.write(&packet).await {
            warn!("HID write error: {:?}", Debug2Format(&e));
            framer.clear();
            return;
        }
    }
}
