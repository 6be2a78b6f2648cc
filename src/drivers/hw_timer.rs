//! Control-period timer on ESP-IDF's esp_timer.
//!
//! One periodic callback is the sole producer of the event queue.  Every
//! period it advances the seconds timebase and queues `ControlTick` and
//! `WatchdogTick`; every `telemetry_every` periods it also queues
//! `TelemetryTick`.
//!
//! The callback runs in the esp_timer task (not an ISR) and touches only
//! atomics and the critical-section clock.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
static CONTROL_TIMER: AtomicPtr<esp_timer> = AtomicPtr::new(core::ptr::null_mut());

#[cfg(target_os = "espidf")]
static PERIOD_MS: AtomicU32 = AtomicU32::new(1_000);
#[cfg(target_os = "espidf")]
static TELEMETRY_EVERY: AtomicU32 = AtomicU32::new(10);
#[cfg(target_os = "espidf")]
static PERIODS: AtomicU32 = AtomicU32::new(0);

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_period_cb(_arg: *mut core::ffi::c_void) {
    crate::timebase::on_timer_interrupt(PERIOD_MS.load(Ordering::Relaxed));

    let n = PERIODS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    if !push_event(Event::ControlTick) {
        return;
    }
    if n % TELEMETRY_EVERY.load(Ordering::Relaxed).max(1) == 0 {
        push_event(Event::TelemetryTick);
    }
    push_event(Event::WatchdogTick);
}

/// Start the periodic control timer.
#[cfg(target_os = "espidf")]
pub fn start_timers(period_ms: u32, telemetry_every: u32) {
    PERIOD_MS.store(period_ms, Ordering::Relaxed);
    TELEMETRY_EVERY.store(telemetry_every, Ordering::Relaxed);

    let args = esp_timer_create_args_t {
        callback: Some(control_period_cb),
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: c"control".as_ptr(),
        skip_unhandled_events: true,
    };
    let mut handle: esp_timer_handle_t = core::ptr::null_mut();

    // SAFETY: `args` and `handle` outlive the calls; the callback only
    // touches atomics and the critical-section clock.
    let rc = unsafe { esp_timer_create(&args, &mut handle) };
    if rc != ESP_OK {
        log::error!("hw_timer: create failed (rc={rc}), no control ticks");
        return;
    }
    CONTROL_TIMER.store(handle, Ordering::Release);

    // SAFETY: `handle` was just created and is never deleted.
    let rc = unsafe { esp_timer_start_periodic(handle, u64::from(period_ms) * 1_000) };
    if rc != ESP_OK {
        log::error!("hw_timer: start failed (rc={rc})");
        return;
    }
    log::info!("hw_timer: control period {period_ms} ms, telemetry every {telemetry_every}");
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_period_ms: u32, _telemetry_every: u32) {
    log::info!("hw_timer(sim): no timer on host, tests drive ticks directly");
}

/// Stop the control timer before light sleep.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    let handle = CONTROL_TIMER.load(Ordering::Acquire);
    if !handle.is_null() {
        // SAFETY: non-null handles come from `esp_timer_create` and stay valid.
        unsafe {
            esp_timer_stop(handle);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}

/// Restart the control timer after light sleep.
#[cfg(target_os = "espidf")]
pub fn resume_timers() {
    let handle = CONTROL_TIMER.load(Ordering::Acquire);
    if !handle.is_null() {
        let period_us = u64::from(PERIOD_MS.load(Ordering::Relaxed)) * 1_000;
        // SAFETY: see `stop_timers`.
        unsafe {
            esp_timer_start_periodic(handle, period_us);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn resume_timers() {}
