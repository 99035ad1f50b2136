// Services - the operations the HTTP layer and the seeder call into

pub mod engagement_service;
pub mod listing_service;
pub mod post_service;
pub mod statistics_service;

pub use engagement_service::EngagementService;
pub use listing_service::{ListingService, Page, PageRequest};
pub use post_service::{PostDeletion, PostService};
pub use statistics_service::{CollectionSummary, DashboardOverview, StatisticsService};
