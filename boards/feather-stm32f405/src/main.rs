#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod eth;
mod indicator;
mod network;
mod power;
mod time;
mod tls_buffers;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use calendar_core::{Collaborators, WakeConfig, WakeCycle};
    use cortex_m::peripheral::SCB;
    use defmt::{error, info};
    use embassy_futures::join::{join, join3};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use hal_abstractions::WakeCause;

    use crate::indicator::StatusLed;
    use crate::network::{
        EthernetLink, HttpsConfig, HttpsTransport, NetworkConfig, SignalTimeSync, SntpClient,
        SntpConfig,
    };
    use crate::power::{self, StandbyPower};
    use crate::time::MonoClock;

    type Peri<T> = embassy_stm32::Peri<'static, T>;

    /// W5500 FeatherWing on SPI2
    struct NetworkPeripherals {
        spi: Peri<peripherals::SPI2>,
        sck: Peri<peripherals::PB13>,
        mosi: Peri<peripherals::PB15>,
        miso: Peri<peripherals::PB14>,
        cs: Peri<peripherals::PC6>,
        reset: Peri<peripherals::PC3>,
        int: Peri<peripherals::PC2>,
        exti: Peri<peripherals::EXTI2>,
        dma_tx: Peri<peripherals::DMA1_CH4>,
        dma_rx: Peri<peripherals::DMA1_CH3>,
    }

    /// DS3231 on I2C1 (SCL PB6, SDA PB7)
    struct RtcPeripherals {
        i2c: Peri<peripherals::I2C1>,
        scl: Peri<peripherals::PB6>,
        sda: Peri<peripherals::PB7>,
        dma_tx: Peri<peripherals::DMA1_CH6>,
        dma_rx: Peri<peripherals::DMA1_CH0>,
    }

    embassy_stm32::bind_interrupts!(struct Irqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
        I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
        I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
        scb: SCB,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        info!("Calendar wake firmware starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (RNG clock)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);

        let cause = power::take_wake_cause();
        info!("Wake cause: {:?}", cause);

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);

        let led = Output::new(p.PC1, Level::Low, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        let rtc_periph = RtcPeripherals {
            i2c: p.I2C1,
            scl: p.PB6,
            sda: p.PB7,
            dma_tx: p.DMA1_CH6,
            dma_rx: p.DMA1_CH0,
        };

        wake_task::spawn(net_periph, rtc_periph, p.RNG, cause).ok();

        (
            Shared {},
            Local {
                led,
                scb: cx.core.SCB,
            },
        )
    }

    /// Runs the network stack, the SNTP worker and the wake cycle
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1, local = [led])]
    async fn wake_task(
        cx: wake_task::Context,
        periph: NetworkPeripherals,
        rtc_periph: RtcPeripherals,
        rng_periph: Peri<peripherals::RNG>,
        cause: WakeCause,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use embassy_stm32::rng::Rng;
        use static_cell::StaticCell;

        let net_config = NetworkConfig::default();

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_periph = crate::eth::EthPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };

        // A missing network only costs this pass its fetch; the cycle still
        // arms the fallback alarm and sleeps.
        let network = match crate::eth::init_w5500(eth_periph, net_config.mac_addr).await {
            Ok((device, w5500_runner)) => {
                // DHCP, DNS, SNTP (UDP) and HTTPS (TCP)
                static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
                let (stack, net_runner) = embassy_net::new(
                    device,
                    Config::dhcpv4(Default::default()),
                    RESOURCES.init(StackResources::new()),
                    net_config.seed,
                );
                info!("Network stack initialized with DHCP");
                Some((stack, w5500_runner, net_runner))
            }
            Err(e) => {
                error!("Ethernet hardware unavailable: {:?}", e);
                None
            }
        };
        let stack = network.as_ref().map(|(stack, _, _)| *stack);

        let tls_buffers = crate::tls_buffers::take();
        if tls_buffers.is_none() {
            error!("TLS buffers already taken");
        }

        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = Hertz::khz(100);
        let rtc_bus = I2c::new(
            rtc_periph.i2c,
            rtc_periph.scl,
            rtc_periph.sda,
            Irqs,
            rtc_periph.dma_tx,
            rtc_periph.dma_rx,
            i2c_config,
        );

        let mut cycle = WakeCycle::new(
            WakeConfig::with_url(env!("CALENDAR_URL")),
            Collaborators {
                rtc_bus,
                network: EthernetLink::new(stack),
                time_sync: SignalTimeSync::new(),
                transport: HttpsTransport::new(
                    stack,
                    Rng::new(rng_periph, Irqs),
                    tls_buffers,
                    HttpsConfig::default(),
                ),
                power: StandbyPower::new(cause),
                indicator: StatusLed::new(cx.local.led),
                delay: embassy_time::Delay,
                clock: MonoClock::new(),
            },
        );

        let drivers = async {
            match network {
                Some((stack, w5500_runner, mut net_runner)) => {
                    let sntp = SntpClient::new(SntpConfig::default());
                    join3(
                        w5500_runner.run(),
                        net_runner.run(),
                        crate::network::sntp::run_worker(stack, sntp),
                    )
                    .await;
                }
                None => core::future::pending::<()>().await,
            }
        };

        let (_, never) = join(drivers, cycle.run()).await;
        never
    }

    /// WFI loop; performs the standby entry requested by the wake cycle
    #[idle(local = [scb])]
    fn idle(cx: idle::Context) -> ! {
        loop {
            if power::standby_requested() {
                cx.local.scb.set_sleepdeep();
            }
            cortex_m::asm::wfi();
        }
    }
}
