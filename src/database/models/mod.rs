pub mod account;
pub mod analytics;
pub mod lead;
pub mod profile;
pub mod tag;
pub mod vcard;

pub use account::{Account, AccountUpdate};
pub use analytics::{AnalyticsSummary, DailyBucket, NewTapEvent, TapEvent};
pub use lead::{
    FieldPayload, FieldType, FieldValidation, Lead, LeadFormField, LeadFormSettings, LeadSubmission,
    NewField, NewLead, PublicLeadForm, SubmissionReceipt,
};
pub use profile::{
    ActiveCandidate, Link, LinkPayload, NewLink, NewProfile, Profile, ProfilePayload, ProfileUpdate,
    ProfileWithLinks, PublicProfile, Theme,
};
pub use tag::{HardwareTag, TagAssignment, TagStatus, TagWithAssignment, TapResolution};
pub use vcard::{VcardPayload, VcardProfile};
