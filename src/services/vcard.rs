use tracing::info;

use crate::database::models::{VcardPayload, VcardProfile};
use crate::database::Store;
use crate::services::accounts::AccountService;
use crate::services::leads::is_valid_email;
use crate::services::{ServiceError, ServiceResult};

const MAX_PHOTO_BYTES: usize = 512 * 1024;

/// Escape a text value per RFC 2426.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Fold a content line at 75 octets without splitting a UTF-8 sequence.
fn fold(line: &str, out: &mut String) {
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > 75 {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `data:image/png;base64,....` into (TYPE, payload).
fn split_data_url(data: &str) -> Option<(String, &str)> {
    let rest = data.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let kind = mime.rsplit('/').next().unwrap_or("jpeg").to_ascii_uppercase();
    Some((kind, payload))
}

/// vCard 3.0 text with CRLF line endings.
pub fn render_vcard(card: &VcardPayload) -> String {
    let mut lines = vec!["BEGIN:VCARD".to_string(), "VERSION:3.0".to_string()];

    let full_name = present(&card.full_name).unwrap_or("");
    lines.push(format!("FN:{}", escape(full_name)));
    let (given, family) = match full_name.rsplit_once(' ') {
        Some((given, family)) => (given.trim(), family),
        None => (full_name, ""),
    };
    lines.push(format!("N:{};{};;;", escape(family), escape(given)));

    if let Some(company) = present(&card.company) {
        lines.push(format!("ORG:{}", escape(company)));
    }
    if let Some(title) = present(&card.title) {
        lines.push(format!("TITLE:{}", escape(title)));
    }
    if let Some(email) = present(&card.email) {
        lines.push(format!("EMAIL;TYPE=INTERNET:{}", escape(email)));
    }
    if let Some(phone) = present(&card.phone) {
        lines.push(format!("TEL;TYPE=CELL:{}", escape(phone)));
    }
    if let Some(website) = present(&card.website) {
        lines.push(format!("URL:{}", escape(website)));
    }
    if let Some(address) = present(&card.address) {
        lines.push(format!("ADR;TYPE=WORK:;;{};;;;", escape(address)));
    }
    if let Some(note) = present(&card.note) {
        lines.push(format!("NOTE:{}", escape(note)));
    }
    if let Some(photo) = present(&card.photo_data) {
        match split_data_url(photo) {
            Some((kind, payload)) => lines.push(format!("PHOTO;ENCODING=b;TYPE={}:{}", kind, payload)),
            None => lines.push(format!("PHOTO;VALUE=URI:{}", photo)),
        }
    }
    lines.push("END:VCARD".to_string());

    let mut out = String::new();
    for line in &lines {
        fold(line, &mut out);
    }
    out
}

#[derive(Clone)]
pub struct VcardService {
    store: Store,
    accounts: AccountService,
}

impl VcardService {
    pub fn new(store: Store, accounts: AccountService) -> Self {
        Self { store, accounts }
    }

    pub async fn get_vcard(&self, account_id: &str) -> ServiceResult<Option<VcardProfile>> {
        Ok(self.store.vcards.get(account_id).await?)
    }

    pub async fn save_vcard(&self, account_id: &str, payload: VcardPayload) -> ServiceResult<VcardProfile> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let payload = VcardPayload {
            full_name: clean(payload.full_name),
            title: clean(payload.title),
            email: clean(payload.email),
            phone: clean(payload.phone),
            company: clean(payload.company),
            website: clean(payload.website),
            address: clean(payload.address),
            note: clean(payload.note),
            photo_data: clean(payload.photo_data),
            photo_name: clean(payload.photo_name),
        };

        if let Some(email) = &payload.email {
            if !is_valid_email(email) {
                return Err(ServiceError::field("email", "Enter a valid email address"));
            }
        }
        if payload.photo_data.as_ref().map(|p| p.len() > MAX_PHOTO_BYTES).unwrap_or(false) {
            return Err(ServiceError::field("photo_data", "Photo is too large"));
        }

        let saved = self.store.vcards.upsert(account_id, &payload).await?;
        info!("Saved vCard for account {}", account_id);
        Ok(saved)
    }

    /// File name and body of the public contact card. Accounts without a
    /// saved card get one built from their display name.
    pub async fn public_vcard(&self, handle: &str) -> ServiceResult<(String, String)> {
        let account = self.accounts.find_by_handle(handle).await?;
        let username = account.username.clone().unwrap_or_default();

        let card = match self.store.vcards.get(&account.user_id).await? {
            Some(saved) => VcardPayload::from(saved),
            None => VcardPayload {
                full_name: account.display_name.clone().or_else(|| Some(username.clone())),
                ..Default::default()
            },
        };
        Ok((format!("{}.vcf", username), render_vcard(&card)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_escaped_card() {
        let card = VcardPayload {
            full_name: Some("Ada Lovelace".into()),
            company: Some("Engines, Ltd; Analytical".into()),
            email: Some("ada@example.com".into()),
            note: Some("line one\nline two".into()),
            ..Default::default()
        };
        let text = render_vcard(&card);
        assert!(text.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Ada Lovelace\r\n"));
        assert!(text.contains("N:Lovelace;Ada;;;\r\n"));
        assert!(text.contains("ORG:Engines\\, Ltd\\; Analytical\r\n"));
        assert!(text.contains("NOTE:line one\\nline two\r\n"));
        assert!(text.ends_with("END:VCARD\r\n"));
        assert!(!text.contains("TEL"));
    }

    #[test]
    fn folds_long_lines() {
        let card = VcardPayload {
            full_name: Some("A".into()),
            note: Some("x".repeat(200)),
            ..Default::default()
        };
        let text = render_vcard(&card);
        assert!(text.split("\r\n").all(|line| line.len() <= 75));
        assert!(text.contains("\r\n x"));
    }

    #[test]
    fn embeds_data_url_photos() {
        let card = VcardPayload {
            full_name: Some("A".into()),
            photo_data: Some("data:image/png;base64,iVBORw0K".into()),
            ..Default::default()
        };
        assert!(render_vcard(&card).contains("PHOTO;ENCODING=b;TYPE=PNG:iVBORw0K\r\n"));
    }
}
