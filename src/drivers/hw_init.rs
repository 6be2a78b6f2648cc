//! One-shot hardware peripheral initialization and register helpers.
//!
//! Configures ADC channels, GPIO outputs, and the LEDC timer/channels
//! of the buck stage using raw ESP-IDF sys calls.  `init_peripherals`
//! is called once from `main()` before the event loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before event loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

pub const ADC1_CH_PANEL_VOLTAGE: u32 = pins::PANEL_VOLTAGE_ADC_CH;
pub const ADC1_CH_PANEL_CURRENT: u32 = pins::PANEL_CURRENT_ADC_CH;
pub const ADC1_CH_BATTERY_VOLTAGE: u32 = pins::BATTERY_VOLTAGE_ADC_CH;
pub const ADC1_CH_CHARGE_CURRENT: u32 = pins::CHARGE_CURRENT_ADC_CH;
pub const ADC1_CH_TEMP_1: u32 = pins::TEMP_1_ADC_CH;
pub const ADC1_CH_TEMP_2: u32 = pins::TEMP_2_ADC_CH;

/// Full-scale reading of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.  `init_adc()` completes before the event
/// loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for channel in [
        ADC1_CH_PANEL_VOLTAGE,
        ADC1_CH_PANEL_CURRENT,
        ADC1_CH_BATTERY_VOLTAGE,
        ADC1_CH_CHARGE_CURRENT,
        ADC1_CH_TEMP_1,
        ADC1_CH_TEMP_2,
    ] {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }
    }

    info!("hw_init: ADC1 configured (CH4-7=power path, CH8-9=NTC)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.clamp(0, i32::from(ADC_MAX)) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    0
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::GATE_DRIVER_ENABLE_GPIO,
        pins::LOAD_SWITCH_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        // Gate drivers off, load disconnected until the supervisor decides.
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// Drive the gate-driver shutdown line.
#[cfg(target_os = "espidf")]
pub fn gate_driver_enable(on: bool) {
    gpio_write(pins::GATE_DRIVER_ENABLE_GPIO, on);
}

#[cfg(not(target_os = "espidf"))]
pub fn gate_driver_enable(_on: bool) {}

/// Drive the load MOSFET switch.
#[cfg(target_os = "espidf")]
pub fn load_switch_write(connected: bool) {
    gpio_write(pins::LOAD_SWITCH_GPIO, connected);
}

#[cfg(not(target_os = "espidf"))]
pub fn load_switch_write(_connected: bool) {}

// ── LEDC PWM (buck phases) ───────────────────────────────────

pub const LEDC_CH_PHASE_0: u32 = 0;
pub const LEDC_CH_PHASE_180: u32 = 1;

#[cfg(target_os = "espidf")]
const LEDC_PHASE_TIMER: ledc_timer_t = ledc_timer_t_LEDC_TIMER_0;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: both buck phases.  Boot at high frequency, 7-bit.
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: LEDC_PHASE_TIMER,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_7_BIT,
        freq_hz: 125_000,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }

    let phases = [
        (LEDC_CH_PHASE_0, pins::PHASE_0_PWM_GPIO),
        (LEDC_CH_PHASE_180, pins::PHASE_180_PWM_GPIO),
    ];
    for (channel, gpio) in phases {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: LEDC_PHASE_TIMER,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }
        // Hold both outputs low until the power stage enables them.
        unsafe { ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0) };
    }

    info!("hw_init: LEDC configured (phase0=CH0, phase180=CH1, timer0)");
    Ok(())
}

/// Reprogram the shared phase timer.
#[cfg(target_os = "espidf")]
pub fn ledc_configure_timer(freq_hz: u32, resolution_bits: u32) {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: LEDC_PHASE_TIMER,
        duty_resolution: resolution_bits,
        freq_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: Timer 0 is owned by the power stage; main loop only.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK {
        log::error!("hw_init: LEDC timer reconfigure to {} Hz failed (rc={})", freq_hz, ret);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_configure_timer(_freq_hz: u32, _resolution_bits: u32) {}

/// Write duty and phase offset of one buck channel.
#[cfg(target_os = "espidf")]
pub fn ledc_set_phase_duty(channel: u32, duty: u16, hpoint: u32) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty_with_hpoint(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            u32::from(duty),
            hpoint,
        );
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_phase_duty(_channel: u32, _duty: u16, _hpoint: u32) {}

/// Resume output on a stopped channel with the given duty and offset.
#[cfg(target_os = "espidf")]
pub fn ledc_start_phase(channel: u32, duty: u16, hpoint: u32) {
    // SAFETY: re-binding a configured channel to timer 0; main loop only.
    unsafe {
        ledc_bind_channel_timer(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, LEDC_PHASE_TIMER);
    }
    ledc_set_phase_duty(channel, duty, hpoint);
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_start_phase(_channel: u32, _duty: u16, _hpoint: u32) {}

/// Stop a buck channel with its output held low.
#[cfg(target_os = "espidf")]
pub fn ledc_stop_phase(channel: u32) {
    // SAFETY: see ledc_set_phase_duty().
    unsafe {
        ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_stop_phase(_channel: u32) {}
