#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    buffered_uarte::{self, BufferedUarte},
    gpio::{Input, Pull},
    peripherals, uarte,
};
use meatbag_core::config::{BAUD, CYCLE_TIMESPAN, EVENT_TIMESPAN, SERIAL_BAUDRATE};
use meatbag_core::runner::SystemClock;
use {defmt_rtt as _, panic_probe as _};

const HOST_BAUDRATE: uarte::Baudrate = match SERIAL_BAUDRATE {
    9600 => uarte::Baudrate::BAUD9600,
    19200 => uarte::Baudrate::BAUD19200,
    38400 => uarte::Baudrate::BAUD38400,
    57600 => uarte::Baudrate::BAUD57600,
    115200 => uarte::Baudrate::BAUD115200,
    _ => core::panic!("unsupported host serial baudrate"),
};

bind_interrupts!(struct Irqs {
    UARTE0 => buffered_uarte::InterruptHandler<peripherals::UARTE0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!(
        "meatbag transcriber: {} baud sampling ({} ms cycle, {} ms events), host link {} baud",
        BAUD, CYCLE_TIMESPAN, EVENT_TIMESPAN, SERIAL_BAUDRATE
    );

    // switch to VDD, released switch reads low
    let activation = Input::new(p.P0_11, Pull::Down);
    let signal = Input::new(p.P0_12, Pull::Down);

    let mut uart_host_config = uarte::Config::default();
    uart_host_config.parity = uarte::Parity::EXCLUDED;
    uart_host_config.baudrate = HOST_BAUDRATE;
    let mut uart_host_tx_buffer = [0u8; 256];
    let mut uart_host_rx_buffer = [0u8; 16];
    let uart_host = BufferedUarte::new(
        p.UARTE0,
        p.TIMER0,
        p.PPI_CH0,
        p.PPI_CH1,
        p.PPI_GROUP0,
        p.P0_08,
        p.P0_06,
        Irqs,
        uart_host_config,
        &mut uart_host_rx_buffer,
        &mut uart_host_tx_buffer,
    );

    let runner = meatbag_core::runner::new(uart_host, activation, signal, SystemClock);
    runner.run().await
}
