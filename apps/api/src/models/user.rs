use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One registrant, as persisted in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub clerk_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub friday: bool,
    pub monday: bool,
    pub shirt: String,
    pub registered: bool,
    pub paid: bool,
}

impl UserRecord {
    pub fn from_fields(id: i64, fields: UserFields) -> Self {
        UserRecord {
            id,
            clerk_id: fields.clerk_id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            friday: fields.friday,
            monday: fields.monday,
            shirt: fields.shirt,
            registered: fields.registered,
            paid: fields.paid,
        }
    }
}

/// Canonical user shape: the business key plus every mutable field.
/// This is what an upsert writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub clerk_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub friday: bool,
    pub monday: bool,
    pub shirt: String,
    pub registered: bool,
    pub paid: bool,
}

impl UserFields {
    /// A record for `clerk_id` with every workflow field at its default.
    pub fn new(clerk_id: impl Into<String>) -> Self {
        UserFields {
            clerk_id: clerk_id.into(),
            first_name: None,
            last_name: None,
            friday: false,
            monday: false,
            shirt: String::new(),
            registered: false,
            paid: false,
        }
    }
}

/// Fields the front-end is allowed to edit. `paid` is deliberately absent;
/// it only moves through the paid-status patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub clerk_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub friday: bool,
    pub monday: bool,
    pub shirt: String,
    pub registered: bool,
}

impl ProfileUpdate {
    /// Overwrites the profile fields of `record`, leaving `id` and `paid` alone.
    pub fn apply_to(&self, record: &mut UserRecord) {
        record.first_name = self.first_name.clone();
        record.last_name = self.last_name.clone();
        record.friday = self.friday;
        record.monday = self.monday;
        record.shirt = self.shirt.clone();
        record.registered = self.registered;
    }

    /// Candidate for creation-via-upsert; `paid` starts false.
    pub fn into_fields(self) -> UserFields {
        UserFields {
            clerk_id: self.clerk_id,
            first_name: self.first_name,
            last_name: self.last_name,
            friday: self.friday,
            monday: self.monday,
            shirt: self.shirt,
            registered: self.registered,
            paid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> ProfileUpdate {
        ProfileUpdate {
            clerk_id: "user_1".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            friday: true,
            monday: false,
            shirt: "M".to_string(),
            registered: true,
        }
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = UserRecord::from_fields(3, UserFields::new("user_1"));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "clerkId": "user_1",
                "firstName": null,
                "lastName": null,
                "friday": false,
                "monday": false,
                "shirt": "",
                "registered": false,
                "paid": false
            })
        );
    }

    #[test]
    fn test_apply_profile_keeps_id_and_paid() {
        let mut record = UserRecord::from_fields(9, UserFields::new("user_1"));
        record.paid = true;

        profile().apply_to(&mut record);

        assert_eq!(record.id, 9);
        assert!(record.paid);
        assert_eq!(record.shirt, "M");
        assert!(record.registered);
        assert_eq!(record.first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_profile_into_fields_starts_unpaid() {
        let fields = profile().into_fields();
        assert!(!fields.paid);
        assert_eq!(fields.clerk_id, "user_1");
        assert!(fields.friday);
    }

    #[test]
    fn test_record_from_fields_keeps_every_field() {
        let mut fields = UserFields::new("user_2");
        fields.paid = true;
        fields.shirt = "XL".to_string();
        let record = UserRecord::from_fields(1, fields);
        assert_eq!(record.id, 1);
        assert_eq!(record.clerk_id, "user_2");
        assert!(record.paid);
        assert_eq!(record.shirt, "XL");
    }
}
