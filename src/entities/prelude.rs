pub use super::site_readings::Entity as SiteReadings;
