//! Charge control: operating-point tracking, on/off policy and
//! switching-frequency selection.

pub mod frequency;
pub mod mppt;
pub mod policy;

pub use frequency::FrequencySelector;
pub use mppt::{Ceilings, Direction, MpptAction, MpptTracker};
pub use policy::{ChargeDecision, ChargePolicy, PolicyInput, StopReason};
