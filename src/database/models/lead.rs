use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Phone,
    Textarea,
    Select,
    Checkbox,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "email" => Ok(FieldType::Email),
            "phone" | "tel" => Ok(FieldType::Phone),
            "textarea" => Ok(FieldType::Textarea),
            "select" => Ok(FieldType::Select),
            "checkbox" => Ok(FieldType::Checkbox),
            other => Err(format!("Unknown field type '{}'", other)),
        }
    }
}

/// Per-field validation rules, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub email: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadFormField {
    pub id: Uuid,
    pub user_id: String,
    pub handle: String,
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub is_hidden: bool,
    pub validation: FieldValidation,
    pub order_index: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Owner-submitted field definition. `key` is derived from `label` when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub validation: FieldValidation,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewField {
    pub id: Uuid,
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
    pub is_hidden: bool,
    pub validation: FieldValidation,
    pub order_index: i32,
    pub is_active: bool,
}

/// Form-level behaviour for one (account, handle) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadFormSettings {
    pub submit_label: String,
    pub success_message: String,
    pub redirect_url: Option<String>,
    pub require_consent: bool,
    pub consent_text: Option<String>,
    pub honeypot_enabled: bool,
    pub notify_email: Option<String>,
    pub notify_sms: Option<String>,
    pub published: bool,
}

impl Default for LeadFormSettings {
    fn default() -> Self {
        Self {
            submit_label: "Send".to_string(),
            success_message: "Thanks! We'll be in touch.".to_string(),
            redirect_url: None,
            require_consent: false,
            consent_text: None,
            honeypot_enabled: true,
            notify_email: None,
            notify_sms: None,
            published: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub user_id: String,
    pub handle: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    pub custom_fields: Value,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLead {
    pub user_id: String,
    pub handle: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    pub custom_fields: Value,
    pub source_url: Option<String>,
}

/// Public form submission. `honeypot` is the hidden input bots fill in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadSubmission {
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default)]
    pub consent: bool,
    #[serde(default)]
    pub honeypot: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Fields and settings served to the public form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicLeadForm {
    pub handle: String,
    pub fields: Vec<LeadFormField>,
    pub settings: LeadFormSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub accepted: bool,
    pub message: String,
    pub redirect_url: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fill_missing_keys_with_defaults() {
        let s: LeadFormSettings = serde_json::from_str(r#"{"require_consent":true}"#).unwrap();
        assert!(s.require_consent);
        assert!(s.published);
        assert_eq!(s.submit_label, "Send");
    }

    #[test]
    fn field_type_accepts_tel_alias() {
        assert_eq!("tel".parse::<FieldType>(), Ok(FieldType::Phone));
        assert!("date".parse::<FieldType>().is_err());
    }
}
