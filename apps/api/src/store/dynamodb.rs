//! DynamoDB-backed profile store.
//!
//! Item layout (partition key `employee_number`, type S):
//! - `name` S, `last_interaction` S (ISO-8601)
//! - `profile` M: `age` N, `income` N, `family_status` S, `dependents` N,
//!   `health_concerns` L of S, `financial_goals` S
//! - `recommendations` S, or NULL when no advice has been generated yet
//!
//! Enum values are stored as their human labels so items written by the older web
//! client stay readable.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue, TableStatus};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::models::{FamilyStatus, FinancialGoal, HealthConcern, ProfileSnapshot, StoredRecord};
use crate::store::{ProfileStore, StoreError};

pub const PARTITION_KEY: &str = "employee_number";

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoProfileStore {
    client: Client,
    table: String,
}

impl DynamoProfileStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ProfileStore for DynamoProfileStore {
    async fn get(&self, employee_number: &str) -> Result<Option<StoredRecord>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(PARTITION_KEY, AttributeValue::S(employee_number.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(DisplayErrorContext(&e).to_string()))?;

        let Some(item) = output.item() else {
            debug!("No record in {} for {employee_number}", self.table);
            return Ok(None);
        };

        item_to_record(item)
            .map(Some)
            .map_err(|reason| StoreError::Corrupt {
                employee_number: employee_number.to_string(),
                reason,
            })
    }

    async fn put(&self, record: &StoredRecord) -> Result<(), StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(record_to_item(record)))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("Wrote record for {} to {}", record.employee_number, self.table);
                Ok(())
            }
            Err(err) => {
                let missing_table = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                let transport = matches!(
                    err,
                    SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
                );
                let message = DisplayErrorContext(&err).to_string();
                if missing_table || transport {
                    Err(StoreError::Unavailable(message))
                } else {
                    Err(StoreError::Write(message))
                }
            }
        }
    }

    async fn check_ready(&self) -> Result<(), StoreError> {
        let output = self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(DisplayErrorContext(&e).to_string()))?;

        let status = output.table().and_then(|t| t.table_status());
        match status {
            Some(TableStatus::Active) => {
                info!("DynamoDB table {} is active", self.table);
                Ok(())
            }
            other => Err(StoreError::Unavailable(format!(
                "table {} is not active (status: {other:?})",
                self.table
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Item encoding
// ────────────────────────────────────────────────────────────────────────────

pub fn record_to_item(record: &StoredRecord) -> Item {
    let mut item = HashMap::new();
    item.insert(
        PARTITION_KEY.to_string(),
        AttributeValue::S(record.employee_number.clone()),
    );
    item.insert("name".to_string(), AttributeValue::S(record.name.clone()));
    item.insert(
        "last_interaction".to_string(),
        AttributeValue::S(record.last_interaction.to_rfc3339()),
    );
    item.insert(
        "profile".to_string(),
        AttributeValue::M(profile_to_map(&record.profile)),
    );
    item.insert(
        "recommendations".to_string(),
        match &record.recommendations {
            Some(text) => AttributeValue::S(text.clone()),
            None => AttributeValue::Null(true),
        },
    );
    item
}

fn profile_to_map(profile: &ProfileSnapshot) -> Item {
    let mut map = HashMap::new();
    map.insert("age".to_string(), AttributeValue::N(profile.age.to_string()));
    map.insert(
        "income".to_string(),
        AttributeValue::N(profile.income.to_string()),
    );
    map.insert(
        "family_status".to_string(),
        AttributeValue::S(profile.family_status.label().to_string()),
    );
    map.insert(
        "dependents".to_string(),
        AttributeValue::N(profile.dependents.to_string()),
    );
    map.insert(
        "health_concerns".to_string(),
        AttributeValue::L(
            profile
                .health_concerns
                .iter()
                .map(|c| AttributeValue::S(c.label().to_string()))
                .collect(),
        ),
    );
    map.insert(
        "financial_goals".to_string(),
        AttributeValue::S(profile.financial_goal.label().to_string()),
    );
    map
}

pub fn item_to_record(item: &Item) -> Result<StoredRecord, String> {
    let employee_number = item
        .get(PARTITION_KEY)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| format!("missing string attribute '{PARTITION_KEY}'"))?
        .clone();

    let name = item
        .get("name")
        .and_then(|v| v.as_s().ok())
        .cloned()
        .unwrap_or_default();

    let last_interaction = item
        .get("last_interaction")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| "missing string attribute 'last_interaction'".to_string())
        .and_then(|s| parse_timestamp(s))?;

    let profile = match item.get("profile").and_then(|v| v.as_m().ok()) {
        Some(map) => map_to_profile(map)?,
        None => ProfileSnapshot::default(),
    };

    let recommendations = item
        .get("recommendations")
        .and_then(|v| v.as_s().ok())
        .cloned();

    Ok(StoredRecord {
        employee_number,
        name,
        last_interaction,
        profile,
        recommendations,
    })
}

/// Missing profile fields fall back to the form defaults; values outside the form
/// bounds are clamped.
fn map_to_profile(map: &Item) -> Result<ProfileSnapshot, String> {
    let defaults = ProfileSnapshot::default();

    let age = number(map, "age")?.map(|n| n as u32).unwrap_or(defaults.age);
    let income = number(map, "income")?
        .map(|n| n as u64)
        .unwrap_or(defaults.income);
    let dependents = number(map, "dependents")?
        .map(|n| n as u32)
        .unwrap_or(defaults.dependents);

    let family_status = match map.get("family_status").and_then(|v| v.as_s().ok()) {
        Some(label) => FamilyStatus::from_label(label)
            .ok_or_else(|| format!("unknown family_status '{label}'"))?,
        None => defaults.family_status,
    };

    let financial_goal = match map.get("financial_goals").and_then(|v| v.as_s().ok()) {
        Some(label) => FinancialGoal::from_label(label)
            .ok_or_else(|| format!("unknown financial_goals '{label}'"))?,
        None => defaults.financial_goal,
    };

    let mut health_concerns = BTreeSet::new();
    if let Some(values) = map.get("health_concerns").and_then(|v| v.as_l().ok()) {
        for value in values {
            let label = value
                .as_s()
                .map_err(|_| "health_concerns must be a list of strings".to_string())?;
            let concern = HealthConcern::from_label(label)
                .ok_or_else(|| format!("unknown health concern '{label}'"))?;
            health_concerns.insert(concern);
        }
    }

    Ok(ProfileSnapshot {
        age,
        income,
        family_status,
        dependents,
        health_concerns,
        financial_goal,
    }
    .clamped())
}

/// Reads an N attribute. Negative values saturate to zero on the integer cast.
fn number(map: &Item, key: &str) -> Result<Option<f64>, String> {
    match map.get(key) {
        None => Ok(None),
        Some(AttributeValue::N(raw)) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("attribute '{key}' is not a number: {raw}")),
        Some(_) => Err(format!("attribute '{key}' must be a number")),
    }
}

/// Accepts RFC 3339, or a naive ISO timestamp without offset (read as UTC).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid last_interaction '{raw}': {e}"))
}
