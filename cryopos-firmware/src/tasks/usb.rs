//! USB device task

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::UsbDevice;

/// USB driver of the command transport
pub type UsbDriver = Driver<'static, USB>;

/// Run the USB device stack (enumeration, control requests)
#[embassy_executor::task]
pub async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}
