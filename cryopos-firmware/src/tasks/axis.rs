//! Axis tick tasks
//!
//! Each axis's PIO state machine raises its own IRQ flag once per step
//! pulse. The tick task waits for the flag and advances the axis, which may
//! reload, restart or stop the state machine.
//!
//! These tasks run on the interrupt executor so a tick preempts command
//! execution. They never log.

use cryopos_hal_rp2040::StepChannel;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Irq;

use crate::AXES;

/// Advance axis `SM` on every pulse of its state machine
async fn run<const SM: usize>(
    channel: StepChannel<'static, SM>,
    mut irq: Irq<'static, PIO0, SM>,
) -> ! {
    let axis = &AXES[SM];
    let mut control = channel.control();

    loop {
        irq.wait().await;
        axis.tick(&mut control);
    }
}

#[embassy_executor::task]
pub async fn m0_tick_task(channel: StepChannel<'static, 0>, irq: Irq<'static, PIO0, 0>) {
    run(channel, irq).await
}

#[embassy_executor::task]
pub async fn m1_tick_task(channel: StepChannel<'static, 1>, irq: Irq<'static, PIO0, 1>) {
    run(channel, irq).await
}

#[embassy_executor::task]
pub async fn m2_tick_task(channel: StepChannel<'static, 2>, irq: Irq<'static, PIO0, 2>) {
    run(channel, irq).await
}
