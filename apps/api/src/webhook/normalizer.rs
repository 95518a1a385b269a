use crate::errors::AppError;
use crate::models::user::UserFields;
use crate::webhook::verifier::VerifiedEvent;

/// Maps a verified event to the canonical user shape.
///
/// `data.id` becomes the `clerk_id` and is mandatory; an event without it is
/// rejected whole. Workflow fields the event omits take their defaults
/// (`false` / empty shirt), which is what the full-overwrite merge then writes.
pub fn normalize(verified: &VerifiedEvent) -> Result<UserFields, AppError> {
    let data = verified
        .event
        .data
        .as_ref()
        .ok_or(AppError::MissingIdentity)?;

    let clerk_id = data
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingIdentity)?;

    let mut user = UserFields::new(clerk_id);
    user.first_name = data.first_name.clone();
    user.last_name = data.last_name.clone();
    user.friday = data.friday.unwrap_or(user.friday);
    user.monday = data.monday.unwrap_or(user.monday);
    if let Some(shirt) = &data.shirt {
        user.shirt = shirt.clone();
    }
    user.registered = data.registered.unwrap_or(user.registered);
    user.paid = data.paid.unwrap_or(user.paid);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::event::WebhookEvent;
    use serde_json::json;

    fn verified(payload: serde_json::Value) -> VerifiedEvent {
        VerifiedEvent {
            event_id: "msg_1".to_string(),
            timestamp: "1718900000".to_string(),
            event: serde_json::from_value::<WebhookEvent>(payload).unwrap(),
        }
    }

    #[test]
    fn test_defaults_applied_when_fields_absent() {
        let fields = normalize(&verified(json!({
            "data": { "id": "u1", "first_name": "A", "last_name": "B" }
        })))
        .unwrap();

        let mut expected = UserFields::new("u1");
        expected.first_name = Some("A".to_string());
        expected.last_name = Some("B".to_string());
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_explicit_workflow_fields_carried() {
        let fields = normalize(&verified(json!({
            "type": "user.updated",
            "data": {
                "id": "u1",
                "friday": true,
                "monday": true,
                "shirt": "XL",
                "registered": true,
                "paid": true,
                "email_addresses": []
            }
        })))
        .unwrap();

        assert!(fields.friday && fields.monday && fields.registered && fields.paid);
        assert_eq!(fields.shirt, "XL");
        assert_eq!(fields.first_name, None);
    }

    #[test]
    fn test_null_names_become_absent() {
        let fields = normalize(&verified(json!({
            "data": { "id": "u1", "first_name": null, "last_name": null }
        })))
        .unwrap();

        assert_eq!(fields.first_name, None);
        assert_eq!(fields.last_name, None);
    }

    #[test]
    fn test_missing_id_is_missing_identity() {
        let result = normalize(&verified(json!({ "data": { "first_name": "A" } })));
        assert!(matches!(result, Err(AppError::MissingIdentity)));
    }

    #[test]
    fn test_empty_id_is_missing_identity() {
        let result = normalize(&verified(json!({ "data": { "id": "" } })));
        assert!(matches!(result, Err(AppError::MissingIdentity)));
    }

    #[test]
    fn test_missing_data_is_missing_identity() {
        let result = normalize(&verified(json!({ "type": "user.created" })));
        assert!(matches!(result, Err(AppError::MissingIdentity)));

        let result = normalize(&verified(json!({ "data": null })));
        assert!(matches!(result, Err(AppError::MissingIdentity)));
    }
}
