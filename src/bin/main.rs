#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::Spawner;
use embassy_net::{Stack, tcp::TcpSocket};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration as EmbassyDuration, Timer, WithTimeout};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Level, Output, OutputConfig},
    spi::master::Spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{LevelFilter, info, warn};
use static_cell::StaticCell;
use todoo_core::display::{self, ScreenTask};
use todoo_core::ingest::{self, IngestError, IngestEvent, ScheduleReceiver};
use todoo_core::schedule::ScheduleStore;
use todoo_core::transfer::TransferQueue;

use panel::PanelSurface;
use storage::{FlashWriter, PictureFlash};

#[path = "main/panel.rs"]
mod panel;
#[path = "main/storage.rs"]
mod storage;

const LCD_SPI_HZ: u32 = 13_000_000;
const FLASH_SPI_HZ: u32 = 20_000_000;
const SCHEDULE_PORT: u16 = 4545;
const SOCKET_TIMEOUT_SECS: u64 = 30;
const DISPLAY_PERIOD_MS: u64 = 1_000;
const FLASH_DRAIN_PERIOD_MS: u64 = 166;
const BACKPRESSURE_RETRY_MS: u64 = 166;
const WIFI_RETRY_BACKOFF_MIN_SECS: u64 = 2;
const WIFI_RETRY_BACKOFF_MAX_SECS: u64 = 120;
const NETWORK_POLL_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;

const WIFI_SSID: &str = env!(
    "TODOO_WIFI_SSID",
    "Set TODOO_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "TODOO_WIFI_PASSWORD",
    "Set TODOO_WIFI_PASSWORD in your environment before building/flashing."
);

static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();

/// Ingestion-side shared state: the wire decoder, the published
/// schedule and the picture FIFO between the socket reader and the
/// flash drain. Lock scopes stay short and never cross an await.
struct Pipeline {
    receiver: ScheduleReceiver,
    store: ScheduleStore,
    fifo: TransferQueue,
}

impl Pipeline {
    const fn new() -> Self {
        Self {
            receiver: ScheduleReceiver::new(),
            store: ScheduleStore::new(),
            fifo: TransferQueue::new(),
        }
    }
}

static PIPELINE: Mutex<CriticalSectionRawMutex, Pipeline> = Mutex::new(Pipeline::new());
static SCREEN_EVENTS: Signal<CriticalSectionRawMutex, IngestEvent> = Signal::new();
static WRITER_RESTART: AtomicBool = AtomicBool::new(false);

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn wifi_retry_backoff_secs(consecutive_failures: u32) -> u64 {
    // 2, 4, 8, 16, 32, 64, 120, 120, ...
    let shift = consecutive_failures.min(6);
    WIFI_RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(WIFI_RETRY_BACKOFF_MAX_SECS)
}

async fn wait_before_wifi_retry(consecutive_failures: &mut u32) {
    let delay_secs = wifi_retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "wifi retrying in {}s (consecutive_failures={})",
        delay_secs, *consecutive_failures
    );
    Timer::after_secs(delay_secs).await;
}

async fn wifi_connection_loop(wifi_controller: &mut WifiController<'_>, stack: Stack<'_>) -> ! {
    let mut consecutive_failures = 0u32;

    loop {
        if !wifi_controller.is_started().unwrap_or(false) {
            if let Err(err) = wifi_controller.start_async().await {
                info!("wifi start failed: {:?}", err);
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        if let Err(err) = wifi_controller.connect_async().await {
            info!("wifi connect failed: {:?}", err);
            let _ = wifi_controller.disconnect_async().await;
            wait_before_wifi_retry(&mut consecutive_failures).await;
            continue;
        }

        match stack
            .wait_config_up()
            .with_timeout(EmbassyDuration::from_secs(DHCP_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                info!("wifi connected and dhcp ready");
            }
            Err(_) => {
                info!("dhcp timeout; forcing reconnect");
                let _ = wifi_controller.disconnect_async().await;
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        consecutive_failures = 0;

        loop {
            let link_up = stack.is_link_up();
            let has_ipv4 = stack.config_v4().is_some();
            let is_connected = matches!(wifi_controller.is_connected(), Ok(true));

            if !(link_up && has_ipv4 && is_connected) {
                info!(
                    "wifi state lost (link_up={} has_ipv4={} connected={}); reconnecting",
                    link_up, has_ipv4, is_connected
                );
                break;
            }

            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
        }

        let _ = wifi_controller.disconnect_async().await;
        wait_before_wifi_retry(&mut consecutive_failures).await;
    }
}

/// Reads until `buf` is full. An error or a closed peer ends the
/// session.
async fn read_full(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<(), ()> {
    let mut filled = 0;
    while filled < buf.len() {
        match socket.read(&mut buf[filled..]).await {
            Ok(0) => return Err(()),
            Ok(n) => filled += n,
            Err(err) => {
                warn!("socket read failed: {:?}", err);
                return Err(());
            }
        }
    }
    Ok(())
}

/// Hands one frame to the decoder, stalling while the transfer FIFO
/// has no room so the peer's stream backs up instead of corrupting
/// the ring. A new header is also held back until the previous
/// transfer has fully drained to flash; rewinding the write cursor
/// under queued chunks would scatter them.
async fn deliver_frame(frame: &[u8], pipeline: &Mutex<CriticalSectionRawMutex, Pipeline>) {
    loop {
        let outcome = {
            let mut guard = pipeline.lock().await;
            let p = &mut *guard;

            if p.receiver.picture_bytes_remaining() == 0 && !p.fifo.is_empty() {
                Err(IngestError::Backpressure)
            } else {
                let result = p.receiver.on_frame(frame, &mut p.store, &mut p.fifo);
                if matches!(result, Ok(Some(IngestEvent::ScheduleReceived))) {
                    WRITER_RESTART.store(true, Ordering::Release);
                }
                result
            }
        };

        match outcome {
            Ok(Some(event)) => {
                SCREEN_EVENTS.signal(event);
                return;
            }
            Ok(None) => return,
            Err(IngestError::Backpressure) => {
                Timer::after_millis(BACKPRESSURE_RETRY_MS).await;
            }
            Err(IngestError::Malformed) => {
                warn!("malformed schedule frame dropped ({} bytes)", frame.len());
                return;
            }
        }
    }
}

/// One session: length-prefixed frames, each at most
/// [`ingest::FRAME_BYTES`] bytes, until the peer closes or breaks
/// framing.
async fn serve_schedule_peer(
    socket: &mut TcpSocket<'_>,
    pipeline: &Mutex<CriticalSectionRawMutex, Pipeline>,
) {
    let mut frame = [0u8; ingest::FRAME_BYTES];

    loop {
        let mut prefix = [0u8; 1];
        if read_full(socket, &mut prefix).await.is_err() {
            return;
        }

        let len = usize::from(prefix[0]);
        if len == 0 || len > ingest::FRAME_BYTES {
            warn!("peer framing broken: frame length {}", len);
            return;
        }

        if read_full(socket, &mut frame[..len]).await.is_err() {
            return;
        }

        deliver_frame(&frame[..len], pipeline).await;
    }
}

/// Accepts one schedule peer at a time.
async fn schedule_server_loop(
    stack: Stack<'_>,
    pipeline: &Mutex<CriticalSectionRawMutex, Pipeline>,
) -> ! {
    let mut rx_buffer = [0u8; 1024];
    let mut tx_buffer = [0u8; 256];

    loop {
        if !stack.is_config_up() {
            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
            continue;
        }

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(EmbassyDuration::from_secs(SOCKET_TIMEOUT_SECS)));

        info!("schedule server listening on port {}", SCHEDULE_PORT);
        if let Err(err) = socket.accept(SCHEDULE_PORT).await {
            warn!("schedule accept failed: {:?}", err);
            continue;
        }

        info!("schedule peer connected");
        serve_schedule_peer(&mut socket, pipeline).await;
        socket.close();
        info!("schedule peer disconnected");
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: todoo starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // LCD wiring used by this board:
    // CLK=GPIO13, MOSI=GPIO14, CS=GPIO15, DC=GPIO2
    let lcd_dc = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let lcd_cs = Output::new(peripherals.GPIO15, Level::High, OutputConfig::default());

    let lcd_spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(LCD_SPI_HZ))
        // ST7735S uses CPOL=0, CPHA=0.
        .with_mode(esp_hal::spi::Mode::_0);
    let lcd_spi = Spi::new(peripherals.SPI2, lcd_spi_config)
        .unwrap()
        .with_sck(peripherals.GPIO13)
        .with_mosi(peripherals.GPIO14);

    let mut lcd_delay = Delay::new();
    let mut lcd = PanelSurface::new(lcd_spi, lcd_dc, lcd_cs);
    esp_println::println!("display: init begin (CLK=13 MOSI=14 CS=15 DC=2)");
    if let Err(err) = lcd.init(&mut lcd_delay) {
        esp_println::println!("display: initialize failed");
        info!("display initialize failed: {:?}", err);
    } else {
        esp_println::println!("display: initialize ok");
    }
    if let Err(err) =
        display::render::fill_rect(&mut lcd, 0, 0, display::WIDTH, display::HEIGHT, 0x0000)
    {
        info!("display clear failed: {:?}", err);
    }

    // External flash wiring used by this board:
    // CS=GPIO8, SCK=GPIO4, MOSI=GPIO40, MISO=GPIO41
    let flash_cs = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
    let flash_spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(FLASH_SPI_HZ))
        // SST26VF uses CPOL=0, CPHA=0.
        .with_mode(esp_hal::spi::Mode::_0);
    let flash_spi = Spi::new(peripherals.SPI3, flash_spi_config)
        .unwrap()
        .with_sck(peripherals.GPIO4)
        .with_mosi(peripherals.GPIO40)
        .with_miso(peripherals.GPIO41);
    let flash_device = ExclusiveDevice::new(flash_spi, flash_cs, Delay::new()).unwrap();

    let mut picture_flash = PictureFlash::new(flash_device, Delay::new());
    match picture_flash.init() {
        Ok(()) => info!("external flash ready"),
        Err(err) => info!("external flash init failed: {:?}", err),
    }
    let picture_flash = Mutex::<CriticalSectionRawMutex, _>::new(picture_flash);

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    let client_config = ClientConfig::default()
        .with_ssid(WIFI_SSID.into())
        .with_password(WIFI_PASSWORD.into());
    let wifi_mode = ModeConfig::Client(client_config);
    if let Err(err) = wifi_controller.set_config(&wifi_mode) {
        info!("wifi mode config failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        0x7D00_41C3_55AA_90E2,
    );

    info!("Display pins: CLK=GPIO13 MOSI=GPIO14 CS=GPIO15 DC=GPIO2");
    info!("Flash pins: CS=GPIO8 SCK=GPIO4 MOSI=GPIO40 MISO=GPIO41");
    info!(
        "Schedule ingestion on tcp/{}; frame width {} bytes",
        SCHEDULE_PORT,
        ingest::FRAME_BYTES
    );

    let net_future = net_runner.run();
    let wifi_future = wifi_connection_loop(&mut wifi_controller, stack);
    let server_future = schedule_server_loop(stack, &PIPELINE);

    // Drains at most one chunk per period, matching the flash part's
    // program latency without starving the radio.
    let writer_future = async {
        let mut writer = FlashWriter::new();

        loop {
            Timer::after_millis(FLASH_DRAIN_PERIOD_MS).await;

            let chunk = {
                let mut p = PIPELINE.lock().await;
                if WRITER_RESTART.swap(false, Ordering::AcqRel) {
                    writer.restart();
                }
                p.fifo.pop()
            };

            let Some(chunk) = chunk else {
                continue;
            };

            let mut flash = picture_flash.lock().await;
            if let Err(err) = writer.write_chunk(flash.flash(), chunk.data()) {
                warn!(
                    "flash write of {} bytes failed before {:#08X}: {:?}",
                    chunk.len(),
                    writer.cursor(),
                    err
                );
            }
        }
    };

    // One service period per second: advance the wall clock, apply any
    // pipeline event, render.
    let display_future = async {
        let mut screen = ScreenTask::new();
        let mut render_fault_logged = false;

        loop {
            Timer::after_millis(DISPLAY_PERIOD_MS).await;

            if let Some(event) = SCREEN_EVENTS.try_take() {
                info!("screen event: {:?}", event);
                screen.on_event(event);
            }

            let mut flash = picture_flash.lock().await;
            let mut pipe = PIPELINE.lock().await;
            pipe.store.tick();

            match screen.service(&pipe.store, &mut lcd, &mut *flash) {
                Ok(()) => render_fault_logged = false,
                Err(err) => {
                    if !render_fault_logged {
                        warn!("render failed: {:?}", err);
                        render_fault_logged = true;
                    }
                }
            }
        }
    };

    let _ = embassy_futures::join::join5(
        net_future,
        wifi_future,
        server_future,
        writer_future,
        display_future,
    )
    .await;
    unreachable!()
}
