//! Merge policies: how an incoming write is reconciled with the stored record.
//!
//! The store evaluates a policy inside its per-key critical section, so
//! swapping the policy changes conflict behaviour without touching any
//! backend.

use crate::models::user::{UserFields, UserRecord};

/// Computes the fields to persist from the existing record (if any) and the
/// incoming candidate. The returned `clerk_id` must equal the candidate's.
pub type MergePolicy = fn(Option<&UserRecord>, &UserFields) -> UserFields;

/// Last writer wins on every mutable field, including booleans the event only
/// carried as defaults. A webhook without `paid` therefore resets a stored
/// `paid = true` to `false`.
pub fn full_overwrite(_existing: Option<&UserRecord>, incoming: &UserFields) -> UserFields {
    incoming.clone()
}

/// Overwrites everything except `paid`, which stays as stored. Used by the
/// front-end's create-or-update path, which never owns payment state.
pub fn keep_paid(existing: Option<&UserRecord>, incoming: &UserFields) -> UserFields {
    let mut merged = incoming.clone();
    if let Some(existing) = existing {
        merged.paid = existing.paid;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_paid_record() -> UserRecord {
        let mut fields = UserFields::new("user_1");
        fields.first_name = Some("Old".to_string());
        fields.shirt = "L".to_string();
        fields.registered = true;
        fields.paid = true;
        UserRecord::from_fields(1, fields)
    }

    #[test]
    fn test_full_overwrite_clobbers_paid() {
        let existing = stored_paid_record();
        let incoming = UserFields::new("user_1");

        let merged = full_overwrite(Some(&existing), &incoming);

        assert_eq!(merged, incoming);
        assert!(!merged.paid);
        assert!(!merged.registered);
        assert_eq!(merged.shirt, "");
    }

    #[test]
    fn test_full_overwrite_on_insert_is_candidate() {
        let mut incoming = UserFields::new("user_1");
        incoming.paid = true;
        assert_eq!(full_overwrite(None, &incoming), incoming);
    }

    #[test]
    fn test_keep_paid_preserves_stored_flag() {
        let existing = stored_paid_record();
        let mut incoming = UserFields::new("user_1");
        incoming.shirt = "S".to_string();

        let merged = keep_paid(Some(&existing), &incoming);

        assert!(merged.paid);
        assert_eq!(merged.shirt, "S");
        assert!(!merged.registered);
    }

    #[test]
    fn test_keep_paid_on_insert_uses_candidate() {
        let incoming = UserFields::new("user_1");
        assert!(!keep_paid(None, &incoming).paid);
    }
}
