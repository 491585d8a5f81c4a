pub mod clock;
pub mod collector;
pub mod live;
pub mod mailer;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use collector::{CollectionError, MetricsSampler, StaticInfoProvider};
pub use live::LiveSink;
pub use mailer::{MailError, MailMessage, Mailer};
pub use store::{AlertStore, MetricsStore, StoreError, SubscriptionStore, ThresholdStore};
