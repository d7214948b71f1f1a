#![no_std]
#![no_main]

use bme680::{Bme680, I2CAddress, IIRFilterSize, OversamplingSetting, SettingsBuilder};
use bsp::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    adc::{Adc, AdcPin},
    clocks::{init_clocks_and_plls, Clock},
    pac,
    pac::interrupt,
    uart::{DataBits, StopBits, UartConfig, UartPeripheral},
    watchdog::Watchdog,
};
use i2c_pio::I2C;
use rp_pico::hal;
use rp_pico::hal::fugit::RateExtU32;
use rp_pico::hal::gpio::FunctionUart;
use rp_pico::hal::pio::PIOExt;
use rp_pico::hal::Timer;
use soil_node::board::{
    self, AdcPowerGate, AlarmWakeTimer, BoardAnalog, Bme680Climate, UartRadio, WfiSleeper,
};
use soil_node::config::{
    BATTERY_ANALOG_PIN, RADIO_PTT_PIN, RAIL_POWER_PIN, SENSOR_SCL_PIN, SENSOR_SDA_PIN,
    SETUP_SETTLE_MS, SOIL_ANALOG_PIN, WAKE_INTERVAL_INDEX,
};
use soil_node::cycle::NodeParts;
use soil_node::power::PeripheralRail;
use soil_node::transport::{PttKey, TransportConfig};
use soil_node::{NodeConfig, NodeError, SensorNode, WakeScheduler, WakeSignal};

/// Raised by the wake alarm, consumed by the duty cycle. Starts pending so
/// the first cycle runs straight after setup.
static WAKE: WakeSignal = WakeSignal::new();

#[entry]
fn main() -> ! {
    info!("Soil node starting");
    info!(
        "rail GPIO{}, soil GPIO{}, battery GPIO{}, sensor SDA GPIO{} SCL GPIO{}",
        RAIL_POWER_PIN, SOIL_ANALOG_PIN, BATTERY_ANALOG_PIN, SENSOR_SDA_PIN, SENSOR_SCL_PIN
    );
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();
    let _core = pac::CorePeripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let alarm = unwrap!(timer.alarm_0());

    // Peripheral rail (GPIO3) feeds the BME680 and the radio, so it comes up first
    let mut rail = PeripheralRail::new(pins.gpio3.into_push_pull_output());
    rail.power_on();
    timer.delay_ms(SETUP_SETTLE_MS);

    // Soil probe on ADC0, VSYS/3 divider on ADC3
    let adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let soil = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();
    let battery = AdcPin::new(pins.voltage_monitor.into_floating_input()).unwrap();

    // Set up BME680 over PIO I2C
    let (mut pio, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);

    let i2c_pio = I2C::new(
        &mut pio,
        pins.gpio8,
        pins.gpio9,
        sm0,
        100.kHz(),
        clocks.system_clock.freq(),
    );

    let bme = unwrap!(
        Bme680::init(i2c_pio, &mut timer, I2CAddress::Secondary).map_err(|_| NodeError::Sensor)
    );
    // Applied by the adapter before its first measurement and after every rail restore
    let settings = SettingsBuilder::new()
        .with_humidity_oversampling(OversamplingSetting::OS2x)
        .with_pressure_oversampling(OversamplingSetting::OS4x)
        .with_temperature_oversampling(OversamplingSetting::OS8x)
        .with_temperature_filter(IIRFilterSize::Size3)
        .with_run_gas(false)
        .build();

    // Set up the radio: UART0 TX on GPIO0, push-to-talk on GPIO2
    let radio_config = TransportConfig::default();
    info!(
        "radio TX GPIO{} at {} bit/s, PTT GPIO{}",
        radio_config.tx_pin, radio_config.bit_rate, RADIO_PTT_PIN
    );
    let uart_pins = (
        pins.gpio0.into_function::<FunctionUart>(),
        pins.gpio1.into_function::<FunctionUart>(),
    );
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(radio_config.bit_rate.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();
    let ptt = PttKey::new(pins.gpio2.into_push_pull_output(), radio_config.ptt_inverted);

    let parts = NodeParts {
        analog: BoardAnalog::new(adc, soil, battery),
        converter: AdcPowerGate,
        sleeper: WfiSleeper,
        climate: Bme680Climate::new(bme, timer, settings),
        radio: UartRadio::new(uart, ptt),
        clock: timer,
        rail,
        delay: timer,
    };
    let mut node = SensorNode::new(&WAKE, parts, NodeConfig::default());

    // Arm the wake alarm last; the first cycle is already pending
    let _scheduler = unwrap!(WakeScheduler::arm(
        AlarmWakeTimer::new(alarm),
        WAKE_INTERVAL_INDEX
    ));

    info!("Soil node ready");

    node.run()
}

#[interrupt]
fn TIMER_IRQ_0() {
    board::on_wake_alarm(&WAKE);
}
