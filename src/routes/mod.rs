mod campaigns;
mod health_check;
mod subscriptions;
mod uploads;

pub use campaigns::*;
pub use health_check::*;
pub use subscriptions::*;
pub use uploads::*;
