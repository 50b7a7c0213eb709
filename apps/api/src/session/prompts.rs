//! Prompt construction for the three interaction kinds.
//!
//! Output is a pure function of (intent, profile). Sets are ordered, so the same
//! inputs always produce byte-identical prompts.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::models::{BenefitType, Intent, ProfileSnapshot};

pub const MIN_COMPARE_TYPES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIntent {
    #[error("select at least one benefit type")]
    NoBenefitTypes,

    #[error("select at least {MIN_COMPARE_TYPES} benefit types to compare (got {0})")]
    TooFewToCompare(usize),

    #[error("question must not be empty")]
    EmptyQuestion,
}

/// Checks an intent without building anything.
pub fn validate(intent: &Intent) -> Result<(), InvalidIntent> {
    match intent {
        Intent::Recommend { benefit_types } if benefit_types.is_empty() => {
            Err(InvalidIntent::NoBenefitTypes)
        }
        Intent::Compare { benefit_types } if benefit_types.len() < MIN_COMPARE_TYPES => {
            Err(InvalidIntent::TooFewToCompare(benefit_types.len()))
        }
        Intent::CustomQuestion { text } if text.trim().is_empty() => {
            Err(InvalidIntent::EmptyQuestion)
        }
        _ => Ok(()),
    }
}

pub fn build(intent: &Intent, profile: &ProfileSnapshot) -> Result<String, InvalidIntent> {
    validate(intent)?;

    let prompt = match intent {
        Intent::Recommend { benefit_types } => format!(
            "Recommend optimal benefits for: Age: {}, Income: ${}, Family: {}, Dependents: {}, \
             Health priorities: {}, Goal: {}. Focus on: {}",
            profile.age,
            profile.income,
            profile.family_status,
            profile.dependents,
            health_priorities(profile),
            profile.financial_goal,
            join_types(benefit_types),
        ),
        // Not profile-scoped: the user's text goes through untouched.
        Intent::CustomQuestion { text } => text.clone(),
        Intent::Compare { benefit_types } => format!(
            "Compare and contrast these benefits for someone with profile: Age {}, Income ${}, \
             Family status: {}. Benefits to compare: {}",
            profile.age,
            profile.income,
            profile.family_status,
            join_types(benefit_types),
        ),
    };

    Ok(prompt)
}

fn health_priorities(profile: &ProfileSnapshot) -> String {
    if profile.health_concerns.is_empty() {
        return "none".to_string();
    }
    profile
        .health_concerns
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_types(types: &BTreeSet<BenefitType>) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
