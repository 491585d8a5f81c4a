pub mod delivery_policy;
pub mod window;

pub use delivery_policy::DeliveryPolicy;
pub use window::AlertWindow;
