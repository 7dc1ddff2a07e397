pub mod catalog;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod timestamp;
pub mod well_guide;

pub use catalog::{RecurrenceCatalog, StaticRecurrenceCatalog};
pub use status::StatusEngine;
pub use store::{GuideCatalogStore, GuideRecordStore, SupabaseGuideStore};
pub use well_guide::WellGuideService;
