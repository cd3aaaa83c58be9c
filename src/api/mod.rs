mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::DashboardError;
use crate::vehicle_data::VehicleDataPage;

pub use http::HttpBackend;

pub(crate) const LIST_ENDPOINT: &str = "vehicle_data/";
pub(crate) const UPLOAD_CHUNK_ENDPOINT: &str = "vehicle_data/upload_chunk/";
pub(crate) const FINALIZE_UPLOAD_ENDPOINT: &str = "vehicle_data/finalize_upload/";

/// Query string of a list request, in the order the backend documents them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub vehicle_id: String,
    pub page: u32,
    pub page_size: u32,
    pub initial_timestamp: Option<String>,
    pub final_timestamp: Option<String>,
    pub timezone: Option<String>,
    pub ordering: Option<String>,
}

impl ListQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("vehicle_id", self.vehicle_id.clone()),
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(initial) = &self.initial_timestamp {
            params.push(("initial_timestamp", initial.clone()));
        }
        if let Some(fin) = &self.final_timestamp {
            params.push(("final_timestamp", fin.clone()));
        }
        if let Some(tz) = &self.timezone {
            params.push(("timezone", tz.clone()));
        }
        if let Some(ordering) = &self.ordering {
            params.push(("ordering", ordering.clone()));
        }
        params
    }
}

/// One piece of a chunked upload, sent as a multipart form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkUpload {
    pub file_name: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub vehicle_id: String,
    pub data: Vec<u8>,
}

/// Body of the finalize call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalizeUpload {
    pub file_name: String,
    pub total_chunks: u64,
    pub vehicle_id: String,
}

/// Endpoints of the vehicle data backend.
///
/// Every call resolves to an error when the backend is unreachable or answers
/// with a non-success status.
pub trait VehicleDataApi {
    /// Paginated, filtered and sorted record list
    fn list(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<VehicleDataPage, DashboardError>> + Send;

    /// Store one chunk server side
    fn upload_chunk(
        &self,
        chunk: ChunkUpload,
    ) -> impl Future<Output = Result<(), DashboardError>> + Send;

    /// Assemble previously uploaded chunks and process the dataset
    fn finalize_upload(
        &self,
        request: &FinalizeUpload,
    ) -> impl Future<Output = Result<(), DashboardError>> + Send;
}
