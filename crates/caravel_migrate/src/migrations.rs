//! The shipped migrations.

use crate::runner::{Migration, MigrationContext};
use caravel_birthdays::{Birthday, BirthdayDocument};
use caravel_error::{
    CaravelResult, StateConflictError, StateConflictErrorKind, ValidationError,
    ValidationErrorKind,
};
use serde_json::{Value, json};

/// Whether a JSON value looks like a single birthday record.
fn is_birthday_shaped(value: &Value) -> bool {
    value.is_object() && value.get("month").is_some_and(Value::is_u64)
        && value.get("day").is_some_and(Value::is_u64)
}

/// Whether a JSON value looks like a legacy per-guild bucket of birthdays.
///
/// An empty object can only be a bucket: a birthday record always carries
/// `month` and `day`.
fn is_legacy_bucket(value: &Value) -> bool {
    match value.as_object() {
        Some(bucket) => !is_birthday_shaped(value) && bucket.values().all(is_birthday_shaped),
        None => false,
    }
}

/// Migration 1: flatten the legacy guild-nested birthday document.
///
/// The pre-migration deployment stored `{guild_id: {user_id: birthday}}`;
/// the current shape is `{user_id: birthday}`. Guilds are processed in
/// ascending guild-id order and a user present in several guilds keeps the
/// last one's entry, so the merge is deterministic. A document holding both
/// shapes at once is a state conflict: the migration aborts without touching
/// anything and the operator decides which format is authoritative.
pub struct FlattenBirthdays;

#[async_trait::async_trait]
impl Migration for FlattenBirthdays {
    fn id(&self) -> u32 {
        1
    }

    fn name(&self) -> &'static str {
        "flatten-birthdays"
    }

    async fn run(&self, context: &MigrationContext) -> CaravelResult<Value> {
        let raw = context.birthday_store.load_raw().await?;
        let Some(entries) = raw.as_object() else {
            return Err(ValidationError::new(ValidationErrorKind::DocumentShape(
                "birthday document is not a JSON object".to_string(),
            ))
            .into());
        };

        let flat_users = entries.values().filter(|value| is_birthday_shaped(value)).count();
        let buckets = entries.values().filter(|value| is_legacy_bucket(value)).count();

        if flat_users + buckets != entries.len() {
            return Err(ValidationError::new(ValidationErrorKind::DocumentShape(
                "birthday document holds entries that are neither birthdays nor guild buckets"
                    .to_string(),
            ))
            .into());
        }
        if flat_users > 0 && buckets > 0 {
            return Err(StateConflictError::new(StateConflictErrorKind::MixedFormat(format!(
                "{flat_users} flat birthdays alongside {buckets} guild buckets; resolve manually"
            )))
            .into());
        }
        if buckets == 0 {
            tracing::info!(users = flat_users, "Birthday document already flat");
            return Ok(json!({ "already_flat": true, "users": flat_users }));
        }

        let mut guild_ids: Vec<&String> = entries.keys().collect();
        guild_ids.sort();

        let mut flattened = BirthdayDocument::new();
        let mut overridden = 0usize;
        for guild_id in &guild_ids {
            let Some(bucket) = entries[*guild_id].as_object() else {
                continue;
            };
            for (user_id, value) in bucket {
                let birthday: Birthday = serde_json::from_value(value.clone()).map_err(|e| {
                    ValidationError::new(ValidationErrorKind::DocumentShape(format!(
                        "birthday for user {user_id} in guild {guild_id}: {e}"
                    )))
                })?;
                if flattened.insert(user_id.clone(), birthday).is_some() {
                    overridden += 1;
                }
            }
        }

        context.birthday_store.commit(flattened.clone()).wait().await?;
        tracing::info!(
            guilds = guild_ids.len(),
            users = flattened.len(),
            overridden,
            "Flattened guild-nested birthday document"
        );
        Ok(json!({
            "guilds": guild_ids.len(),
            "users": flattened.len(),
            "overridden": overridden,
        }))
    }
}

/// Migration 2: reserved schema slot.
///
/// Bumps the version without transforming anything. The slot was claimed for
/// a schema change that never shipped; deployed status documents already
/// carry version 2, so the bump stays.
pub struct ReserveSchemaSlot;

#[async_trait::async_trait]
impl Migration for ReserveSchemaSlot {
    fn id(&self) -> u32 {
        2
    }

    fn name(&self) -> &'static str {
        "reserve-schema-slot"
    }

    async fn run(&self, _context: &MigrationContext) -> CaravelResult<Value> {
        Ok(json!({ "noop": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_birthday_and_bucket_shapes() {
        let birthday = json!({"month": 6, "day": 15});
        let with_year = json!({"month": 6, "day": 15, "year": 1990});
        let bucket = json!({"u1": {"month": 6, "day": 15}});
        let empty_bucket = json!({});

        assert!(is_birthday_shaped(&birthday));
        assert!(is_birthday_shaped(&with_year));
        assert!(!is_birthday_shaped(&bucket));
        assert!(is_legacy_bucket(&bucket));
        assert!(is_legacy_bucket(&empty_bucket));
        assert!(!is_legacy_bucket(&birthday));
        assert!(!is_legacy_bucket(&json!("nonsense")));
    }
}
