//! Tranche interval crowdsale
//!
//! A fixed allocation is split evenly over `number_of_intervals` intervals of
//! ledger positions. Each interval's reserve price adapts to the previous
//! interval's demand, the first `guaranteed_intervals` are restricted to an
//! allow-list, and total proceeds are bounded by a cap that is only published
//! as a digest. Closed intervals settle pro rata against
//! `max(interval_total, reserve_amount)`.

pub mod claim;
pub mod errors;
pub mod events;
pub mod hidden_cap;
pub mod params;
pub mod participation;
pub mod reserve;
pub mod sale;
pub mod scheduler;
pub mod settings;
pub mod whitelist;

pub use claim::{entitlement, token_rate, ClaimAllReceipt, ClaimReceipt};
pub use errors::{CrowdsaleError, Result};
pub use events::SaleEvent;
pub use hidden_cap::{CapDigest, HiddenCap};
pub use params::{SaleConfig, SaleParams};
pub use participation::{ParticipationLedger, ParticipationRecord};
pub use reserve::{Adjustment, IntervalParams, ReserveAdjuster, ReserveBands};
pub use sale::Crowdsale;
pub use scheduler::IntervalScheduler;
pub use settings::{SaleSettings, DEFAULT_INTERVAL_LENGTH};
pub use whitelist::{Whitelist, WhitelistPolicy};
