//! sqlx-backed repositories. Queries are built at runtime so the crate builds
//! without a live database.

mod accounts;
mod analytics;
mod leads;
mod profiles;
mod tags;
mod vcards;

pub use accounts::PgAccountRepository;
pub use analytics::PgAnalyticsRepository;
pub use leads::PgLeadRepository;
pub use profiles::PgProfileRepository;
pub use tags::PgTagRepository;
pub use vcards::PgVcardRepository;
