//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `hardware`     | SensorPort         | ESP32 ADC1 (via SensorHub)    |
//! |                | PowerStagePort     | LEDC buck phases, gate driver |
//! |                | LoadPort           | Load MOSFET GPIO              |
//! | `log_sink`     | EventSink          | Serial log output             |
//!
//! The seconds clock ([`crate::timebase::SYSTEM_CLOCK`]) implements
//! `ClockPort` directly.

pub mod hardware;
pub mod log_sink;
