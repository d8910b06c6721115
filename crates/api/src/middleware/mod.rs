//! HTTP middleware components.

pub mod admin;
pub mod logging;
pub mod metrics;
pub mod trace_id;

pub use admin::{require_admin, ADMIN_KEY_HEADER};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware, record_analysis};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
