//! Query state of the dashboard and the controller reconciling backend
//! responses against it.
//!
//! Every user action maps to a transition on an immutable [`QueryState`]. The
//! controller turns the new state into a [`PendingQuery`] tagged with a fresh
//! generation; only the response for the latest generation is applied.

mod query;

use std::time::{Duration, Instant};

use chrono_tz::Tz;
use itertools::Itertools;
use log::{debug, error};

use crate::api::ListQuery;
use crate::errors::DashboardError;
use crate::vehicle_data::{VehicleDataPage, VehicleRecord, soc_series};

pub use query::{
    DEFAULT_PAGE_SIZE, PAGE_SIZES, QueryState, SortColumn, SortDirection, SortOrder, TimeRange,
    parse_page_input, parse_range_input, total_pages,
};

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data: backend unreachable";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload: backend unreachable";
pub const UPLOAD_DONE_MESSAGE: &str = "CSV uploaded successfully!";
const UPLOAD_DONE_NOTICE_DURATION: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    expires_at: Option<Instant>,
}

impl Notice {
    fn new(text: &str, kind: NoticeKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
            expires_at: None,
        }
    }

    fn expiring(text: &str, kind: NoticeKind, expires_at: Instant) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..Self::new(text, kind)
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }
}

/// User actions that lead to a new list query.
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardAction {
    Refresh,
    SelectVehicle(String),
    SetPageSize(u32),
    Sort(SortColumn),
    FirstPage,
    PreviousPage,
    NextPage,
    LastPage,
    CommitPageInput,
    /// Jump to a page before the total page count is known
    GoToPage(u32),
    ApplyRange(TimeRange),
    ResetRange,
}

/// A list query waiting to be sent, tagged with its generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingQuery {
    pub generation: u64,
    pub query: ListQuery,
}

pub struct DashboardController {
    state: QueryState,
    timezone: Tz,
    generation: u64,
    records: Vec<VehicleRecord>,
    current_page: u32,
    total_pages: u32,
    vehicle_ids: Vec<String>,
    page_input: String,
    notice: Option<Notice>,
    upload_progress: Option<u8>,
}

impl DashboardController {
    pub fn new(page_size: u32, timezone: Tz) -> Self {
        Self {
            state: QueryState::new(page_size),
            timezone,
            generation: 0,
            records: Vec::new(),
            current_page: 1,
            total_pages: 1,
            vehicle_ids: Vec::new(),
            page_input: "1".to_string(),
            notice: None,
            upload_progress: None,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn vehicle_ids(&self) -> &[String] {
        &self.vehicle_ids
    }

    pub fn page_input(&self) -> &str {
        &self.page_input
    }

    pub fn set_page_input(&mut self, input: &str) {
        self.page_input = input.to_string();
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn upload_progress(&self) -> Option<u8> {
        self.upload_progress
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 1
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page == self.total_pages
    }

    pub fn soc_series(&self) -> Vec<[f64; 2]> {
        soc_series(&self.records)
    }

    /// Applies a user action and returns the query to send for it.
    pub fn apply(&mut self, action: DashboardAction) -> PendingQuery {
        let next = match action {
            DashboardAction::Refresh => self.state.with_page(1),
            DashboardAction::SelectVehicle(vehicle_id) => self.state.select_vehicle(&vehicle_id),
            DashboardAction::SetPageSize(size) => self.state.with_page_size(size),
            DashboardAction::Sort(column) => self.state.toggle_sort(column),
            DashboardAction::FirstPage => self.state.with_page(1),
            DashboardAction::PreviousPage => {
                self.state.with_page(self.current_page.saturating_sub(1).max(1))
            }
            DashboardAction::NextPage => self
                .state
                .with_page((self.current_page + 1).min(self.total_pages)),
            DashboardAction::LastPage => self.state.with_page(self.total_pages),
            DashboardAction::CommitPageInput => self
                .state
                .with_page(parse_page_input(&self.page_input, self.total_pages)),
            DashboardAction::GoToPage(page) => self.state.with_page(page),
            DashboardAction::ApplyRange(range) => self.state.with_range(range),
            DashboardAction::ResetRange => {
                self.page_input = "1".to_string();
                self.state.with_range(TimeRange::default())
            }
        };
        self.issue(next)
    }

    fn issue(&mut self, state: QueryState) -> PendingQuery {
        self.state = state;
        self.generation += 1;
        debug!("Issuing query generation {}: {:?}", self.generation, self.state);
        PendingQuery {
            generation: self.generation,
            query: self.state.to_query(&self.timezone),
        }
    }

    /// Applies a list response. Returns `false` when the response belongs to
    /// an older query and was dropped.
    pub fn reconcile(
        &mut self,
        generation: u64,
        result: Result<VehicleDataPage, DashboardError>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                "Dropping stale response for generation {} (latest is {})",
                generation, self.generation
            );
            return false;
        }
        match result {
            Ok(page) => {
                self.total_pages = total_pages(page.count, self.state.page_size());
                self.current_page = self.state.page();
                self.page_input = self.current_page.to_string();
                self.records = page.results;
                self.vehicle_ids = page.vehicle_ids.into_iter().unique().collect();
            }
            Err(e) => {
                error!("List query failed: {}", e);
                self.notice = Some(Notice::new(FETCH_FAILED_MESSAGE, NoticeKind::Error));
            }
        }
        true
    }

    pub fn begin_upload(&mut self) {
        self.upload_progress = Some(0);
    }

    pub fn on_upload_progress(&mut self, progress: Option<u8>) {
        self.upload_progress = progress;
    }

    pub fn on_upload_message(&mut self, message: &str) {
        self.notice = Some(Notice::new(message, NoticeKind::Info));
    }

    /// The backend finalized the dataset, refresh the displayed data.
    pub fn on_upload_complete(&mut self) -> PendingQuery {
        self.apply(DashboardAction::Refresh)
    }

    /// The whole upload succeeded: show the new dataset.
    pub fn upload_succeeded(&mut self, vehicle_id: &str, now: Instant) -> PendingQuery {
        self.notice = Some(Notice::expiring(
            UPLOAD_DONE_MESSAGE,
            NoticeKind::Success,
            now + UPLOAD_DONE_NOTICE_DURATION,
        ));
        self.apply(DashboardAction::SelectVehicle(vehicle_id.to_string()))
    }

    pub fn upload_failed(&mut self, e: &DashboardError) {
        error!("Upload failed: {}", e);
        self.notice = Some(Notice::new(UPLOAD_FAILED_MESSAGE, NoticeKind::Error));
        self.upload_progress = None;
    }

    pub fn input_rejected(&mut self, e: &DashboardError) {
        self.notice = Some(Notice::new(&e.to_string(), NoticeKind::Error));
    }

    pub fn expire_notice(&mut self, now: Instant) {
        if let Some(expires_at) = self.notice.as_ref().and_then(|n| n.expires_at)
            && now >= expires_at
        {
            self.notice = None;
        }
    }
}
