pub mod alert;
pub mod metric_tree;
pub mod static_info;
pub mod subscription;
pub mod threshold;

pub use alert::{AlertEntry, AlertEvent, AlertGroups, AlertId};
pub use metric_tree::{MetricMap, MetricNode, Snapshot};
pub use static_info::{InterfaceInfo, StaticInfo};
pub use subscription::{EmailSubscription, InvalidAddress, MailRelayConfig};
pub use threshold::{ThresholdConfig, ThresholdMap, ThresholdNode, ThresholdPatch};
