//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  Telemetry goes out
//! as a single JSON object per line so a console scraper can parse it.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("TELEM | {json}"),
                Err(e) => warn!("TELEM | serialisation failed: {e}"),
            },
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {from} -> {to}");
            }
            AppEvent::ChargingStarted { duty } => {
                info!("CHARGE | started, duty={duty}");
            }
            AppEvent::ChargingStopped(reason) => {
                info!("CHARGE | stopped: {reason}");
            }
            AppEvent::StatusChanged(status) => {
                info!("STATUS | {status} (0b{:08b})", status.bits());
            }
            AppEvent::FrequencyChanged(mode) => {
                info!("PWM | frequency {:?} ({} Hz)", mode, mode.frequency_hz());
            }
            AppEvent::SleepRequested(secs) => {
                info!("POWER | sleeping {secs} s");
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={state}");
            }
        }
    }
}
