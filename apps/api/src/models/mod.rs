pub mod intent;
pub mod profile;
pub mod record;

pub use intent::{BenefitType, Intent};
pub use profile::{FamilyStatus, FinancialGoal, HealthConcern, ProfileSnapshot};
pub use record::{Identity, StoredRecord};
