// Library interface for fleetview
// This allows integration tests and benches to access internal modules

pub mod api;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod upload;
pub mod vehicle_data;
pub mod worker;

// Re-export commonly used types
pub use api::{HttpBackend, VehicleDataApi};
pub use dashboard::{DashboardAction, DashboardController, PendingQuery, QueryState};
pub use errors::DashboardError;
pub use upload::{UploadFile, UploadJob, UploadObserver, UploadState, upload_file_in_chunks};
pub use vehicle_data::{VehicleDataPage, VehicleRecord};
