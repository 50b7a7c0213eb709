#![allow(dead_code)]

//! Profile Session — one user's visit, from identification through advice and persistence.
//!
//! The session is a plain value owned by the caller. Collaborators (store, advice
//! client) are passed into each operation, so nothing here is process-wide.
//!
//! Phases: Unidentified → Resolving → Ready → Generating → Committing → Ready.
//! A store failure while resolving, or an unreachable store while committing, leaves
//! the session Degraded: still usable for advice, but no further writes are attempted.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod freshness;
pub mod handlers;
pub mod prompts;
pub mod registry;

use crate::llm_client::{Advice, AdviceClient};
use crate::models::record::MIN_EMPLOYEE_NUMBER_LEN;
use crate::models::{BenefitType, Identity, Intent, ProfileSnapshot, StoredRecord};
use crate::store::{ProfileStore, StoreError};
use freshness::FreshnessPolicy;
use prompts::InvalidIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unidentified,
    Resolving,
    Ready,
    Generating,
    Committing,
    /// Ready, but persistence is switched off for the rest of the session.
    Degraded,
}

/// Caller-side input problems. None of these change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter your name")]
    EmptyName,

    #[error("employee number must be at least {MIN_EMPLOYEE_NUMBER_LEN} characters")]
    EmployeeNumberTooShort,

    #[error("load a profile before requesting advice")]
    NotIdentified,

    #[error("invalid profile: {0}")]
    Profile(String),

    #[error(transparent)]
    Intent(#[from] InvalidIntent),
}

/// How the stored record was used when a profile was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// No record for this employee number.
    NewProfile,
    /// Record within the freshness window; profile and advice reused.
    Restored,
    /// Record too old; identity kept, profile and advice reset to defaults.
    Stale,
    /// Store could not be read; session continues without persistence.
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub resolution: Resolution,
    /// The stored name differs from the one supplied; it is replaced on the next commit.
    pub name_mismatch: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitStatus {
    Committed { at: DateTime<Utc> },
    Skipped { reason: String },
    Failed { reason: String },
}

impl CommitStatus {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitStatus::Committed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionOutcome {
    pub advice: Advice,
    pub commit: CommitStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub freshness: FreshnessPolicy,
    /// Upper bound on any single store call.
    pub store_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            freshness: FreshnessPolicy::default(),
            store_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileSession {
    settings: SessionSettings,
    phase: SessionPhase,
    identity: Option<Identity>,
    profile: ProfileSnapshot,
    recommendations: Option<String>,
    last_interaction: Option<DateTime<Utc>>,
    degraded: Option<String>,
    name_update_pending: bool,
    last_benefit_types: BTreeSet<BenefitType>,
}

impl Default for ProfileSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl ProfileSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            phase: SessionPhase::Unidentified,
            identity: None,
            profile: ProfileSnapshot::default(),
            recommendations: None,
            last_interaction: None,
            degraded: None,
            name_update_pending: false,
            last_benefit_types: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn profile(&self) -> &ProfileSnapshot {
        &self.profile
    }

    pub fn recommendations(&self) -> Option<&str> {
        self.recommendations.as_deref()
    }

    pub fn last_interaction(&self) -> Option<DateTime<Utc>> {
        self.last_interaction
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn name_update_pending(&self) -> bool {
        self.name_update_pending
    }

    pub fn completion_percent(&self) -> u8 {
        self.profile
            .completion_percent(!self.last_benefit_types.is_empty())
    }

    fn settle(&mut self) {
        self.phase = if self.degraded.is_some() {
            SessionPhase::Degraded
        } else {
            SessionPhase::Ready
        };
    }

    /// Load Profile. Validates the identity, then resolves the stored record.
    ///
    /// Store errors never surface as `Err`; they produce `Resolution::StoreUnavailable`
    /// and a degraded session. Loading again later retries the store.
    pub async fn identify(
        &mut self,
        store: &dyn ProfileStore,
        name: &str,
        employee_number: &str,
        now: DateTime<Utc>,
    ) -> Result<LoadOutcome, ValidationError> {
        let name = name.trim();
        let employee_number = employee_number.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if employee_number.chars().count() < MIN_EMPLOYEE_NUMBER_LEN {
            return Err(ValidationError::EmployeeNumberTooShort);
        }

        self.phase = SessionPhase::Resolving;
        self.profile = ProfileSnapshot::default();
        self.recommendations = None;
        self.last_interaction = None;
        self.last_benefit_types.clear();
        self.name_update_pending = false;
        self.degraded = None;

        let fetched = timed(self.settings.store_timeout, store.get(employee_number)).await;

        let (resolution, name_mismatch) = match fetched {
            Ok(None) => {
                info!("No stored profile for {employee_number}; starting new");
                (Resolution::NewProfile, false)
            }
            Ok(Some(record)) => {
                let mismatch = record.name != name;
                if mismatch {
                    warn!("Stored name for {employee_number} differs; will update on next commit");
                }
                self.last_interaction = Some(record.last_interaction);
                if self
                    .settings
                    .freshness
                    .is_fresh(record.last_interaction, now)
                {
                    info!("Restored profile for {employee_number}");
                    self.profile = record.profile;
                    self.recommendations = record.recommendations;
                    (Resolution::Restored, mismatch)
                } else {
                    info!("Stored profile for {employee_number} is stale; starting fresh");
                    (Resolution::Stale, mismatch)
                }
            }
            Err(e) => {
                warn!("Could not load profile for {employee_number}: {e}; proceeding without persistence");
                self.degraded = Some(e.to_string());
                (Resolution::StoreUnavailable, false)
            }
        };

        self.identity = Some(Identity::new(name, employee_number));
        self.name_update_pending = name_mismatch;
        self.settle();

        Ok(LoadOutcome {
            resolution,
            name_mismatch,
            message: load_message(resolution, name_mismatch),
        })
    }

    /// Replaces the in-memory profile. Nothing is written until the next commit.
    pub fn update_profile(&mut self, profile: ProfileSnapshot) -> Result<(), ValidationError> {
        if self.identity.is_none() {
            return Err(ValidationError::NotIdentified);
        }
        profile.validate().map_err(ValidationError::Profile)?;
        self.profile = profile;
        Ok(())
    }

    /// One advice interaction: build the prompt, generate, then commit.
    ///
    /// The returned advice is always present, even when the commit fails or is skipped.
    /// Custom questions and comparisons still commit the profile and timestamp, but leave
    /// the stored recommendations untouched.
    pub async fn interact(
        &mut self,
        advisor: &AdviceClient,
        store: &dyn ProfileStore,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> Result<InteractionOutcome, ValidationError> {
        if self.identity.is_none() {
            return Err(ValidationError::NotIdentified);
        }
        let prompt = prompts::build(intent, &self.profile)?;

        self.phase = SessionPhase::Generating;
        let advice = advisor.generate(&prompt).await;
        if advice.is_fallback() {
            warn!("Serving fallback advice for {} request", intent.kind());
        }

        // Only Recommend replaces the saved recommendations; other answers are returned
        // to the caller and the previous recommendations are carried forward.
        if let Intent::Recommend { .. } = intent {
            self.recommendations = Some(advice.text().to_string());
        }
        if let Some(types) = intent.benefit_types() {
            self.last_benefit_types = types.clone();
        }

        let commit = self.commit(store, now).await;
        Ok(InteractionOutcome { advice, commit })
    }

    /// Persists the current profile and latest advice without generating anything.
    pub async fn save(
        &mut self,
        store: &dyn ProfileStore,
        now: DateTime<Utc>,
    ) -> Result<CommitStatus, ValidationError> {
        if self.identity.is_none() {
            return Err(ValidationError::NotIdentified);
        }
        Ok(self.commit(store, now).await)
    }

    async fn commit(&mut self, store: &dyn ProfileStore, now: DateTime<Utc>) -> CommitStatus {
        if let Some(reason) = self.degraded.clone() {
            self.settle();
            return CommitStatus::Skipped {
                reason: format!("changes are not being saved: {reason}"),
            };
        }
        let Some(identity) = self.identity.clone() else {
            self.settle();
            return CommitStatus::Skipped {
                reason: "no identity".to_string(),
            };
        };

        self.phase = SessionPhase::Committing;
        let record = StoredRecord {
            employee_number: identity.employee_number,
            name: identity.name,
            last_interaction: now,
            profile: self.profile.clone(),
            recommendations: self.recommendations.clone(),
        };

        let status = match timed(self.settings.store_timeout, store.put(&record)).await {
            Ok(()) => {
                info!("Committed profile for {}", record.employee_number);
                self.last_interaction = Some(now);
                self.name_update_pending = false;
                CommitStatus::Committed { at: now }
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!(
                    "Store unavailable while saving {}: {reason}; disabling persistence",
                    record.employee_number
                );
                self.degraded = Some(reason.clone());
                CommitStatus::Failed { reason }
            }
            Err(e) => {
                warn!("Failed to save profile for {}: {e}", record.employee_number);
                CommitStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.settle();
        status
    }
}

async fn timed<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "store call timed out after {limit:?}"
        ))),
    }
}

fn load_message(resolution: Resolution, name_mismatch: bool) -> String {
    let base = match resolution {
        Resolution::NewProfile => "No prior profile found. Starting new.",
        Resolution::Restored => "Profile loaded successfully.",
        Resolution::Stale => "Last interaction was over 30 days ago. Starting fresh.",
        Resolution::StoreUnavailable => {
            "Your profile could not be loaded. Proceeding without saving changes."
        }
    };
    if name_mismatch {
        format!("{base} Name doesn't match our records and will be updated.")
    } else {
        base.to_string()
    }
}
