pub mod accounts;
pub mod active_profile;
pub mod analytics;
pub mod leads;
pub mod profiles;
pub mod tags;
pub mod vcard;

use std::collections::HashMap;

use crate::database::manager::DatabaseError;

pub use accounts::AccountService;
pub use analytics::AnalyticsService;
pub use leads::{LeadNotifier, LeadService, LogNotifier};
pub use profiles::ProfileService;
pub use tags::TagService;
pub use vcard::VcardService;

/// Domain-level failures, translated to HTTP at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.clone());
        ServiceError::Validation { message, field_errors }
    }

    /// Collapse accumulated per-field errors; `Ok` when there are none.
    pub fn from_fields(message: &str, field_errors: HashMap<String, String>) -> ServiceResult<()> {
        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation {
                message: message.to_string(),
                field_errors,
            })
        }
    }
}
