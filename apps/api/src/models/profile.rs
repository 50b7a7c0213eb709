use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const AGE_RANGE: RangeInclusive<u32> = 18..=100;
pub const MAX_DEPENDENTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FamilyStatus {
    #[default]
    Single,
    Married,
    MarriedWithChildren,
    SingleParent,
}

impl FamilyStatus {
    pub const ALL: [FamilyStatus; 4] = [
        FamilyStatus::Single,
        FamilyStatus::Married,
        FamilyStatus::MarriedWithChildren,
        FamilyStatus::SingleParent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyStatus::Single => "Single",
            FamilyStatus::Married => "Married",
            FamilyStatus::MarriedWithChildren => "MarriedWithChildren",
            FamilyStatus::SingleParent => "SingleParent",
        }
    }

    /// Human label, as shown on the form and persisted in the store.
    pub fn label(&self) -> &'static str {
        match self {
            FamilyStatus::Single => "Single",
            FamilyStatus::Married => "Married",
            FamilyStatus::MarriedWithChildren => "Married with children",
            FamilyStatus::SingleParent => "Single parent",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.label() == label || s.as_str() == label)
    }
}

impl fmt::Display for FamilyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed catalog of health priorities a user can tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthConcern {
    PreventiveCare,
    ChronicConditions,
    MentalHealth,
    Dental,
    Vision,
}

impl HealthConcern {
    pub const ALL: [HealthConcern; 5] = [
        HealthConcern::PreventiveCare,
        HealthConcern::ChronicConditions,
        HealthConcern::MentalHealth,
        HealthConcern::Dental,
        HealthConcern::Vision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthConcern::PreventiveCare => "PreventiveCare",
            HealthConcern::ChronicConditions => "ChronicConditions",
            HealthConcern::MentalHealth => "MentalHealth",
            HealthConcern::Dental => "Dental",
            HealthConcern::Vision => "Vision",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthConcern::PreventiveCare => "Preventive care",
            HealthConcern::ChronicConditions => "Chronic conditions",
            HealthConcern::MentalHealth => "Mental health",
            HealthConcern::Dental => "Dental",
            HealthConcern::Vision => "Vision",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == label || c.as_str() == label)
    }
}

impl fmt::Display for HealthConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinancialGoal {
    #[default]
    SaveMoney,
    ComprehensiveCoverage,
    BalanceCostAndCoverage,
}

impl FinancialGoal {
    pub const ALL: [FinancialGoal; 3] = [
        FinancialGoal::SaveMoney,
        FinancialGoal::ComprehensiveCoverage,
        FinancialGoal::BalanceCostAndCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialGoal::SaveMoney => "SaveMoney",
            FinancialGoal::ComprehensiveCoverage => "ComprehensiveCoverage",
            FinancialGoal::BalanceCostAndCoverage => "BalanceCostAndCoverage",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FinancialGoal::SaveMoney => "Save money",
            FinancialGoal::ComprehensiveCoverage => "Comprehensive coverage",
            FinancialGoal::BalanceCostAndCoverage => "Balance cost and coverage",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.label() == label || g.as_str() == label)
    }
}

impl fmt::Display for FinancialGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The demographic/financial profile a recommendation is computed from.
/// Every field has a default, so a brand-new identity still gets a complete snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSnapshot {
    pub age: u32,
    pub income: u64,
    pub family_status: FamilyStatus,
    pub dependents: u32,
    pub health_concerns: BTreeSet<HealthConcern>,
    pub financial_goal: FinancialGoal,
}

impl Default for ProfileSnapshot {
    fn default() -> Self {
        Self {
            age: 30,
            income: 50_000,
            family_status: FamilyStatus::Single,
            dependents: 0,
            health_concerns: BTreeSet::new(),
            financial_goal: FinancialGoal::SaveMoney,
        }
    }
}

impl ProfileSnapshot {
    /// Checks the form bounds. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !AGE_RANGE.contains(&self.age) {
            return Err(format!(
                "age must be between {} and {}, got {}",
                AGE_RANGE.start(),
                AGE_RANGE.end(),
                self.age
            ));
        }
        if self.dependents > MAX_DEPENDENTS {
            return Err(format!(
                "dependents must be at most {MAX_DEPENDENTS}, got {}",
                self.dependents
            ));
        }
        Ok(())
    }

    /// Pulls out-of-range values back into bounds. Applied to records read from the
    /// store, which may have been written by other clients.
    pub fn clamped(mut self) -> Self {
        self.age = self.age.clamp(*AGE_RANGE.start(), *AGE_RANGE.end());
        self.dependents = self.dependents.min(MAX_DEPENDENTS);
        self
    }

    /// Share of the form that is filled in, as a whole percentage.
    /// Counts age, income, family status and whether any benefit type is selected.
    pub fn completion_percent(&self, benefit_types_selected: bool) -> u8 {
        let items = [
            self.age > 0,
            self.income > 0,
            true, // family status always has a value
            benefit_types_selected,
        ];
        let filled = items.iter().filter(|b| **b).count();
        (filled * 100 / items.len()) as u8
    }
}
