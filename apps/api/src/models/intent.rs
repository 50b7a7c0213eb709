use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    HealthInsurance,
    Dental,
    Vision,
    EmployeeAssistanceProgram,
    CaregiverResources,
    TutoringSupport,
}

impl BenefitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenefitType::HealthInsurance => "HealthInsurance",
            BenefitType::Dental => "Dental",
            BenefitType::Vision => "Vision",
            BenefitType::EmployeeAssistanceProgram => "EmployeeAssistanceProgram",
            BenefitType::CaregiverResources => "CaregiverResources",
            BenefitType::TutoringSupport => "TutoringSupport",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BenefitType::HealthInsurance => "Health Insurance",
            BenefitType::Dental => "Dental",
            BenefitType::Vision => "Vision",
            BenefitType::EmployeeAssistanceProgram => "Employee Assistance Program",
            BenefitType::CaregiverResources => "Caregiver Resources",
            BenefitType::TutoringSupport => "Tutoring Support",
        }
    }
}

impl fmt::Display for BenefitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked for in one interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Optimal benefit selection, restricted to the given types.
    Recommend { benefit_types: BTreeSet<BenefitType> },
    /// Free-text question, sent without any profile data.
    CustomQuestion { text: String },
    /// Side-by-side comparison of two or more benefit types.
    Compare { benefit_types: BTreeSet<BenefitType> },
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Recommend { .. } => "recommend",
            Intent::CustomQuestion { .. } => "custom_question",
            Intent::Compare { .. } => "compare",
        }
    }

    pub fn benefit_types(&self) -> Option<&BTreeSet<BenefitType>> {
        match self {
            Intent::Recommend { benefit_types } | Intent::Compare { benefit_types } => {
                Some(benefit_types)
            }
            Intent::CustomQuestion { .. } => None,
        }
    }
}
