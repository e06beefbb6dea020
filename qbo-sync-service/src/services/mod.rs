pub mod metrics;
pub mod qbo;
pub mod report;
pub mod token;

pub use metrics::{get_metrics, init_metrics};
pub use qbo::{QboApiError, QboClient};
pub use token::{TokenRefreshError, TokenRefresher};
