pub mod cache;
pub mod profile;

pub use cache::ProfileCache;
pub use profile::{scheduled_profile, ScheduledProfile};
