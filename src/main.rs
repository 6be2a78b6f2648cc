//! SLACC firmware entry point
//!
//! Hexagonal architecture with event-driven execution and light sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter                 LogEventSink   SYSTEM_CLOCK   │
//! │  (Sensor+PowerStage+Load)        (EventSink)    (ClockPort)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Supervisor · Charger · Policy · MPPT · Power          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer (control/telemetry/watchdog ticks) · Task watchdog  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use slacc::adapters::hardware::HardwareAdapter;
use slacc::adapters::log_sink::LogEventSink;
use slacc::app::events::AppEvent;
use slacc::app::ports::EventSink;
use slacc::app::service::AppService;
use slacc::config::SystemConfig;
use slacc::drivers::{hw_timer, watchdog};
use slacc::events::{self, Event};
use slacc::power;
use slacc::timebase::SYSTEM_CLOCK;

/// Margin on top of the sleep period before the watchdog resets us (ms).
const WATCHDOG_MARGIN_MS: u32 = 5_000;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SLACC v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration and peripherals ──────────────────────
    let config = SystemConfig::default();
    let mut hw = match HardwareAdapter::bring_up(&config) {
        Ok(hw) => hw,
        Err(e) => {
            // Defaults are compiled in and the watchdog is not armed yet,
            // so this needs a fix or a power cycle.
            log::error!("Bring-up failed: {}, halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };

    // ── 3. Timers ─────────────────────────────────────────────
    hw_timer::start_timers(
        config.control_loop_interval_ms,
        config.telemetry_interval_secs * 1_000 / config.control_loop_interval_ms.max(1),
    );
    let watchdog = watchdog::Watchdog::new(
        config.sleep_duration_secs * 1_000 + WATCHDOG_MARGIN_MS,
    );

    // ── 4. Construct adapters ─────────────────────────────────
    let mut log_sink = LogEventSink::new();
    let mut clock = &SYSTEM_CLOCK;

    // ── 5. Construct app service ──────────────────────────────
    let mut app = AppService::new(config);
    app.start(&mut hw, &mut log_sink);

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let mut sleep_secs = None;

        events::drain_events(|event| match event {
            Event::ControlTick => {
                sleep_secs = app.tick(&mut hw, &mut clock, &mut log_sink).sleep_secs;
            }

            Event::TelemetryTick => {
                let t = app.build_telemetry();
                log_sink.emit(&AppEvent::Telemetry(t));
            }

            Event::WatchdogTick => watchdog.feed(),
        });

        // Power management.
        if let Some(secs) = sleep_secs {
            hw_timer::stop_timers();
            watchdog.feed();
            power::enter_light_sleep(secs);
            app.wake_from_sleep(&mut clock);
            hw_timer::resume_timers();
            let pending = events::queue_len();
            if pending > 0 {
                warn!("Events pending across sleep: {pending}");
            }
        }

        // Idle until the next timer callback.
        // SAFETY: vTaskDelay only blocks the calling FreeRTOS task.
        unsafe {
            esp_idf_svc::sys::vTaskDelay(1);
        }
    }
}
