// Error types for fleetview

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum DashboardError {
    // Errors for the backend client
    #[snafu(display("Could not build HTTP client"))]
    HttpClientError { source: reqwest::Error },
    #[snafu(display("Request to {endpoint} failed"))]
    RequestError {
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("Backend responded to {endpoint} with status {status}"))]
    BackendStatusError { endpoint: String, status: u16 },
    #[snafu(display("Could not decode response from {endpoint}"))]
    ResponseDecodeError {
        endpoint: String,
        source: reqwest::Error,
    },

    // Upload errors
    #[snafu(display("Error reading upload file"))]
    UploadFileError { source: io::Error },
    #[snafu(display("Invalid upload file: {path}"))]
    InvalidUploadFile { path: String },
    #[snafu(display("Dataset name must not be empty"))]
    EmptyDatasetName,

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Unknown timezone: {name}"))]
    InvalidTimezone { name: String },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // Background worker errors
    #[snafu(display("Network worker is no longer running"))]
    WorkerUnavailable,
    #[snafu(display("Could not start network runtime"))]
    RuntimeError { source: io::Error },
}
