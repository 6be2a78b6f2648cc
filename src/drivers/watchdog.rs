//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the controller if the control loop stalls.  A hung loop would
//! otherwise leave the buck stage switching at a stale duty with no
//! ceiling enforcement.
//!
//! The main loop feeds it on every `WatchdogTick` and right before light
//! sleep, so the timeout must exceed the sleep period.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT calls from the main task during boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("Watchdog: reconfigure returned {} (keeping boot config)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    log::info!("Watchdog: control task subscribed ({} ms, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): {} ms timeout not armed", timeout_ms);
            Self {}
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the subscribed main task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
