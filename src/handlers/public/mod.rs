// Public handlers: profile pages, lead forms, vCards and tag taps.
// Never authenticated.
pub mod lead_form;
pub mod profile;
pub mod system;
pub mod tap;
pub mod vcard;
