//! Cryopos - Cryostat Positioner Firmware
//!
//! Main firmware binary for the RP2040-based three-axis stepper controller
//! of the CUTE cryostat test stand.
//!
//! Each axis has a PIO state machine generating its step pulses and a tick
//! task on a high-priority interrupt executor that runs the motion engine
//! once per pulse. Command batches arrive as USB HID reports and are
//! executed by the dispatcher in thread mode.

#![no_std]
#![no_main]

use cryopos_core::command::{Dispatcher, MotorPort};
use cryopos_core::config::NUM_AXES;
use cryopos_core::motion::Axis;
use cryopos_hal_rp2040::gpio::signal_pin;
use cryopos_hal_rp2040::{AdcBank, AuxPwmOutput, PinBank, StepChannel, StepProgram};
use cryopos_protocol::PACKET_SIZE;
use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::adc::{Adc, Channel};
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::Pull;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::{PIO0, USB};
use embassy_rp::pio::Pio;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::usb::Driver;
use embassy_rp::watchdog::Watchdog;
use embassy_usb::class::hid::{self, HidBootProtocol, HidReaderWriter, HidSubclass};
use embassy_usb::Builder;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::board::{read_serial, Board, IO_CHANNELS};

mod board;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Motion state of every axis, shared by the tick and command tasks
pub static AXES: [Axis; NUM_AXES] = [
    Axis::new(0, config::AXES[0]),
    Axis::new(1, config::AXES[1]),
    Axis::new(2, config::AXES[2]),
];

/// Executor for the axis tick tasks
static TICK_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    TICK_EXECUTOR.on_interrupt()
}

/// USB vendor and product id of the positioner
const USB_VID: u16 = 0x16c0;
const USB_PID: u16 = 0x05df;

/// Vendor-defined HID report descriptor: one 64-byte input and one 64-byte
/// output report
const REPORT_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01, // Usage (0x01)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x40, //   Report Count (64)
    0x09, 0x01, //   Usage (0x01)
    0x81, 0x02, //   Input (Data, Var, Abs)
    0x95, 0x40, //   Report Count (64)
    0x09, 0x01, //   Usage (0x01)
    0x91, 0x02, //   Output (Data, Var, Abs)
    0xC0, // End Collection
];

// USB descriptor and state buffers (must live forever)
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static HID_STATE: StaticCell<hid::State> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Cryopos firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Step pulse generation: one PIO0 state machine per axis
    // m0 STEP=GPIO2, m1 STEP=GPIO6, m2 STEP=GPIO10
    let Pio {
        mut common,
        sm0,
        sm1,
        sm2,
        irq0,
        irq1,
        irq2,
        ..
    } = Pio::new(p.PIO0, Irqs);

    let program = StepProgram::load(&mut common);
    let m0_step = StepChannel::new(
        &mut common,
        sm0,
        &program,
        p.PIN_2,
        AXES[0].clock().hz(),
        AXES[0].current_reload(),
    );
    let m1_step = StepChannel::new(
        &mut common,
        sm1,
        &program,
        p.PIN_6,
        AXES[1].clock().hz(),
        AXES[1].current_reload(),
    );
    let m2_step = StepChannel::new(
        &mut common,
        sm2,
        &program,
        p.PIN_10,
        AXES[2].clock().hz(),
        AXES[2].current_reload(),
    );
    let ports = [
        MotorPort::new(
            m0_step.control(),
            signal_pin(p.PIN_3.into(), config::AXES[0].dir_inverted),
            signal_pin(p.PIN_4.into(), config::AXES[0].on_inverted),
        ),
        MotorPort::new(
            m1_step.control(),
            signal_pin(p.PIN_7.into(), config::AXES[1].dir_inverted),
            signal_pin(p.PIN_8.into(), config::AXES[1].on_inverted),
        ),
        MotorPort::new(
            m2_step.control(),
            signal_pin(p.PIN_11.into(), config::AXES[2].dir_inverted),
            signal_pin(p.PIN_12.into(), config::AXES[2].on_inverted),
        ),
    ];
    info!("PIO step timers initialized");

    // General purpose I/O channels 0..11
    let mut pins = PinBank::<IO_CHANNELS>::new();
    pins.attach(0, p.PIN_16.into());
    pins.attach(1, p.PIN_17.into());
    pins.attach(2, p.PIN_18.into());
    pins.attach(3, p.PIN_19.into());
    pins.attach(4, p.PIN_20.into());
    pins.attach(5, p.PIN_21.into());
    pins.attach(6, p.PIN_22.into());
    pins.attach(7, p.PIN_23.into());
    pins.attach(8, p.PIN_0.into());
    pins.attach(9, p.PIN_1.into());
    pins.attach(10, p.PIN_24.into());
    pins.attach(11, p.PIN_25.into());

    // ADC inputs GPIO26..29
    let adc = Adc::new_blocking(p.ADC, Default::default());
    let adc = AdcBank::new(
        adc,
        [
            Channel::new_pin(p.PIN_26, Pull::None),
            Channel::new_pin(p.PIN_27, Pull::None),
            Channel::new_pin(p.PIN_28, Pull::None),
            Channel::new_pin(p.PIN_29, Pull::None),
        ],
    );

    // Auxiliary PWM on GPIO14 (slice 7, channel A)
    let pwm = AuxPwmOutput::new(Pwm::new_output_a(
        p.PWM_SLICE7,
        p.PIN_14,
        pwm::Config::default(),
    ));

    let mut flash = Flash::<_, Blocking, { board::FLASH_SIZE }>::new_blocking(p.FLASH);
    let serial = read_serial(&mut flash);

    let board = Board::new(pins, adc, pwm, Watchdog::new(p.WATCHDOG), serial);
    let dispatcher = Dispatcher::new(&AXES, ports, board, config::LABEL);
    info!("Board initialized, signals driven to defaults");

    // USB HID command transport
    let driver = Driver::new(p.USB, Irqs);

    let mut usb_config = embassy_usb::Config::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("Cryopos");
    usb_config.product = Some("CUTE positioner");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );

    let hid_config = hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 1,
        max_packet_size: PACKET_SIZE as u16,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };
    let hid = HidReaderWriter::<_, PACKET_SIZE, PACKET_SIZE>::new(
        &mut builder,
        HID_STATE.init(hid::State::new()),
        hid_config,
    );
    let usb = builder.build();
    info!("USB HID initialized");

    // Tick tasks preempt everything running in thread mode
    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let tick_spawner = TICK_EXECUTOR.start(interrupt::SWI_IRQ_1);

    // Spawn tasks
    tick_spawner.spawn(tasks::m0_tick_task(m0_step, irq0)).unwrap();
    tick_spawner.spawn(tasks::m1_tick_task(m1_step, irq1)).unwrap();
    tick_spawner.spawn(tasks::m2_tick_task(m2_step, irq2)).unwrap();
    spawner.spawn(tasks::usb_task(usb)).unwrap();
    spawner.spawn(tasks::command_task(dispatcher, hid)).unwrap();

    info!("All tasks spawned, firmware running");

    // Keeps the PIO block and the flash driver alive; all work happens in
    // the spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
