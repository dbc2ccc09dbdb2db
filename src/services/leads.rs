use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::{
    FieldPayload, FieldType, Lead, LeadFormField, LeadFormSettings, LeadSubmission, NewField, NewLead,
    PublicLeadForm, SubmissionReceipt,
};
use crate::database::Store;
use crate::services::accounts::AccountService;
use crate::services::{ServiceError, ServiceResult};

/// Collaborator told about every stored lead. Delivery (email, SMS) lives
/// behind this seam.
pub trait LeadNotifier: Send + Sync {
    fn lead_captured(&self, lead: &Lead, settings: &LeadFormSettings);
}

/// Default notifier: records the routing decision in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LeadNotifier for LogNotifier {
    fn lead_captured(&self, lead: &Lead, settings: &LeadFormSettings) {
        info!(
            lead_id = %lead.id,
            handle = %lead.handle,
            notify_email = settings.notify_email.is_some(),
            notify_sms = settings.notify_sms.is_some(),
            "Lead captured"
        );
    }
}

/// Field key from a label: lowercase `[a-z0-9_]`, other runs become `_`.
pub fn derive_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    for c in label.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            key.push(c);
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    if key.is_empty() {
        "field".to_string()
    } else {
        key
    }
}

/// Keys for a field list in order: explicit key or one derived from the
/// label, with repeats suffixed `_1`, `_2`, ...
pub fn unique_keys(fields: &[FieldPayload]) -> Vec<String> {
    let mut used = HashSet::new();
    fields
        .iter()
        .map(|field| {
            let base = match field.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                Some(key) => derive_key(key),
                None => derive_key(&field.label),
            };
            let mut key = base.clone();
            let mut n = 1;
            while !used.insert(key.clone()) {
                key = format!("{}_{}", base, n);
                n += 1;
            }
            key
        })
        .collect()
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| value_text(Some(v)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

fn is_checked(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "on" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[derive(Default)]
struct Contact {
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    message: Option<String>,
}

/// Best-effort mapping of arbitrary field keys onto the lead's contact columns.
fn extract_contact(fields: &[&LeadFormField], values: &HashMap<String, String>) -> Contact {
    let mut contact = Contact::default();
    for field in fields {
        let Some(value) = values.get(&field.key).filter(|v| !v.is_empty()) else {
            continue;
        };
        let key = field.key.as_str();
        let slot = if key.contains("email") || field.field_type == FieldType::Email {
            &mut contact.email
        } else if key.contains("phone") || key.contains("mobile") || key == "tel" || field.field_type == FieldType::Phone {
            &mut contact.phone
        } else if key.contains("company") || key.contains("organization") || key.contains("organisation") || key.contains("business") {
            &mut contact.company
        } else if key.starts_with("first") && key.contains("name") {
            &mut contact.first_name
        } else if (key.starts_with("last") && key.contains("name")) || key == "surname" {
            &mut contact.last_name
        } else if key.contains("name") {
            &mut contact.name
        } else if key.contains("message") || key.contains("note") || key.contains("comment") || field.field_type == FieldType::Textarea {
            &mut contact.message
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(value.clone());
        }
    }

    if contact.name.is_none() {
        let parts: Vec<&str> = [contact.first_name.as_deref(), contact.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !parts.is_empty() {
            contact.name = Some(parts.join(" "));
        }
    }
    contact
}

fn csv_cell(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// RFC 4180 rendering of leads, CRLF line endings.
pub fn leads_to_csv(leads: &[Lead]) -> String {
    let mut out = String::from("created_at,handle,name,email,phone,company,message,source_url,custom_fields\r\n");
    for lead in leads {
        let row = [
            lead.created_at.to_rfc3339(),
            lead.handle.clone(),
            lead.name.clone().unwrap_or_default(),
            lead.email.clone().unwrap_or_default(),
            lead.phone.clone().unwrap_or_default(),
            lead.company.clone().unwrap_or_default(),
            lead.message.clone().unwrap_or_default(),
            lead.source_url.clone().unwrap_or_default(),
            lead.custom_fields.to_string(),
        ];
        let cells: Vec<String> = row.iter().map(|c| csv_cell(c)).collect();
        out.push_str(&cells.join(","));
        out.push_str("\r\n");
    }
    out
}

#[derive(Clone)]
pub struct LeadService {
    store: Store,
    accounts: AccountService,
    notifier: Arc<dyn LeadNotifier>,
}

impl LeadService {
    pub fn new(store: Store, accounts: AccountService, notifier: Arc<dyn LeadNotifier>) -> Self {
        Self { store, accounts, notifier }
    }

    fn scope(&self, handle: &str) -> ServiceResult<String> {
        let handle = self.accounts.normalize(handle);
        if handle.is_empty() {
            return Err(ServiceError::field("handle", "Handle is required"));
        }
        Ok(handle)
    }

    pub async fn list_fields(&self, account_id: &str, handle: &str) -> ServiceResult<Vec<LeadFormField>> {
        let handle = self.scope(handle)?;
        Ok(self.store.leads.list_fields(account_id, &handle).await?)
    }

    /// Replace the field set of an (account, handle) scope.
    pub async fn save_fields(
        &self,
        account_id: &str,
        handle: &str,
        fields: Vec<FieldPayload>,
    ) -> ServiceResult<Vec<LeadFormField>> {
        let handle = self.scope(handle)?;

        let mut errors = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            if field.label.trim().is_empty() {
                errors.insert(format!("fields[{}].label", i), "Label is required".to_string());
            }
            if field.field_type == FieldType::Select && field.options.iter().all(|o| o.trim().is_empty()) {
                errors.insert(format!("fields[{}].options", i), "Select fields need at least one option".to_string());
            }
        }
        ServiceError::from_fields("Form fields are invalid", errors)?;

        let owned: HashSet<Uuid> = self
            .store
            .leads
            .list_fields(account_id, &handle)
            .await?
            .iter()
            .map(|f| f.id)
            .collect();
        let keys = unique_keys(&fields);
        let mut used_ids = HashSet::new();

        let rows = fields
            .into_iter()
            .zip(keys)
            .enumerate()
            .map(|(position, (field, key))| NewField {
                id: field
                    .id
                    .filter(|id| owned.contains(id) && used_ids.insert(*id))
                    .unwrap_or_else(Uuid::new_v4),
                key,
                label: field.label.trim().to_string(),
                field_type: field.field_type,
                required: field.required,
                placeholder: field.placeholder.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
                options: field
                    .options
                    .iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
                is_hidden: field.is_hidden,
                validation: field.validation,
                order_index: position as i32,
                is_active: field.is_active,
            })
            .collect();

        let saved = self.store.leads.replace_fields(account_id, &handle, rows).await?;
        info!("Saved {} lead form fields for {}/{}", saved.len(), account_id, handle);
        Ok(saved)
    }

    pub async fn delete_field(&self, account_id: &str, handle: &str, key: &str) -> ServiceResult<bool> {
        let handle = self.scope(handle)?;
        Ok(self.store.leads.delete_field(account_id, &handle, key.trim()).await?)
    }

    pub async fn get_settings(&self, account_id: &str, handle: &str) -> ServiceResult<LeadFormSettings> {
        let handle = self.scope(handle)?;
        Ok(self
            .store
            .leads
            .get_settings(account_id, &handle)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_settings(
        &self,
        account_id: &str,
        handle: &str,
        settings: LeadFormSettings,
    ) -> ServiceResult<LeadFormSettings> {
        let handle = self.scope(handle)?;
        let defaults = LeadFormSettings::default();
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let mut settings = LeadFormSettings {
            submit_label: settings.submit_label.trim().to_string(),
            success_message: settings.success_message.trim().to_string(),
            redirect_url: trimmed(settings.redirect_url),
            consent_text: trimmed(settings.consent_text),
            notify_email: trimmed(settings.notify_email),
            notify_sms: trimmed(settings.notify_sms),
            ..settings
        };
        if settings.submit_label.is_empty() {
            settings.submit_label = defaults.submit_label;
        }
        if settings.success_message.is_empty() {
            settings.success_message = defaults.success_message;
        }

        let mut errors = HashMap::new();
        if let Some(redirect) = &settings.redirect_url {
            let ok = url::Url::parse(redirect)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !ok {
                errors.insert("redirect_url".to_string(), "Redirect must be an http(s) URL".to_string());
            }
        }
        if let Some(email) = &settings.notify_email {
            if !is_valid_email(email) {
                errors.insert("notify_email".to_string(), "Enter a valid email address".to_string());
            }
        }
        ServiceError::from_fields("Form settings are invalid", errors)?;

        Ok(self.store.leads.save_settings(account_id, &handle, &settings).await?)
    }

    /// Enabled, visible fields and settings for a published form.
    pub async fn public_form(&self, handle: &str) -> ServiceResult<PublicLeadForm> {
        let account = self.accounts.find_by_handle(handle).await?;
        let handle = self.scope(handle)?;
        let settings = self
            .store
            .leads
            .get_settings(&account.user_id, &handle)
            .await?
            .unwrap_or_default();
        if !settings.published {
            return Err(ServiceError::NotFound(format!("No published form for '{}'", handle)));
        }

        let fields = self
            .store
            .leads
            .list_fields(&account.user_id, &handle)
            .await?
            .into_iter()
            .filter(|f| f.is_active && !f.is_hidden)
            .collect();
        Ok(PublicLeadForm { handle, fields, settings })
    }

    pub async fn submit_lead(&self, handle: &str, submission: LeadSubmission) -> ServiceResult<SubmissionReceipt> {
        let account = self.accounts.find_by_handle(handle).await?;
        let handle = self.scope(handle)?;
        let settings = self
            .store
            .leads
            .get_settings(&account.user_id, &handle)
            .await?
            .unwrap_or_default();
        if !settings.published {
            return Err(ServiceError::NotFound(format!("No published form for '{}'", handle)));
        }

        let receipt = SubmissionReceipt {
            accepted: true,
            message: settings.success_message.clone(),
            redirect_url: settings.redirect_url.clone(),
        };

        let trap = submission.honeypot.as_deref().map(str::trim).unwrap_or("");
        if settings.honeypot_enabled && !trap.is_empty() {
            debug!("Discarding honeypot submission for '{}'", handle);
            return Ok(receipt);
        }

        let fields = self.store.leads.list_fields(&account.user_id, &handle).await?;
        let active: Vec<&LeadFormField> = fields.iter().filter(|f| f.is_active && !f.is_hidden).collect();

        let mut errors = HashMap::new();
        let mut values = HashMap::new();
        let mut custom = Map::new();
        for field in &active {
            let raw = submission.fields.get(&field.key);
            if field.field_type == FieldType::Checkbox {
                let checked = is_checked(raw);
                if field.required && !checked {
                    errors.insert(field.key.clone(), "This field is required".to_string());
                }
                if checked {
                    custom.insert(field.key.clone(), Value::Bool(true));
                }
                continue;
            }

            let text = value_text(raw);
            if text.is_empty() {
                if field.required {
                    errors.insert(field.key.clone(), "This field is required".to_string());
                }
                continue;
            }
            if let Some(min) = field.validation.min_length {
                if (text.chars().count() as u32) < min {
                    errors.insert(field.key.clone(), format!("Must be at least {} characters", min));
                    continue;
                }
            }
            if (field.field_type == FieldType::Email || field.validation.email) && !is_valid_email(&text) {
                errors.insert(field.key.clone(), "Enter a valid email address".to_string());
                continue;
            }
            if field.field_type == FieldType::Select && !field.options.is_empty() && !field.options.contains(&text) {
                errors.insert(field.key.clone(), "Choose one of the listed options".to_string());
                continue;
            }
            custom.insert(field.key.clone(), Value::String(text.clone()));
            values.insert(field.key.clone(), text);
        }
        // keys outside the rendered form are kept as submitted
        for (key, value) in &submission.fields {
            if value.is_null() || active.iter().any(|f| &f.key == key) {
                continue;
            }
            custom.insert(key.clone(), value.clone());
        }
        if settings.require_consent && !submission.consent {
            errors.insert("consent".to_string(), "Consent is required".to_string());
        }
        ServiceError::from_fields("Please fix the highlighted fields", errors)?;

        let contact = extract_contact(&active, &values);
        let lead = self
            .store
            .leads
            .insert_lead(NewLead {
                user_id: account.user_id.clone(),
                handle,
                name: contact.name,
                email: contact.email,
                phone: contact.phone,
                company: contact.company,
                message: contact.message,
                custom_fields: Value::Object(custom),
                source_url: submission.source_url.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            })
            .await?;

        self.notifier.lead_captured(&lead, &settings);
        Ok(receipt)
    }

    pub async fn list_leads(&self, account_id: &str) -> ServiceResult<Vec<Lead>> {
        Ok(self.store.leads.list_leads(account_id).await?)
    }

    pub async fn export_csv(&self, account_id: &str) -> ServiceResult<String> {
        let leads = self.store.leads.list_leads(account_id).await?;
        Ok(leads_to_csv(&leads))
    }
}
