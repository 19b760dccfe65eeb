mod campaigns;
mod subscribers;

pub use campaigns::CampaignStore;
pub use subscribers::{SubscriberStore, SubscriberStoreError};
