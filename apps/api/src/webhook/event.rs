use serde::Deserialize;

/// The slice of a Clerk user event this service reads. Unknown fields are
/// ignored; Clerk sends many more.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Option<UserEventData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEventData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub friday: Option<bool>,
    #[serde(default)]
    pub monday: Option<bool>,
    #[serde(default)]
    pub shirt: Option<String>,
    #[serde(default)]
    pub registered: Option<bool>,
    #[serde(default)]
    pub paid: Option<bool>,
}
