use chrono::NaiveDateTime;
use chrono_tz::Tz;

use crate::api::ListQuery;
use crate::errors::DashboardError;

pub const PAGE_SIZES: [u32; 5] = [5, 10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const WIRE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const INPUT_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Timestamp,
    Speed,
    Odometer,
    Soc,
    Elevation,
    ShiftState,
}

impl SortColumn {
    pub const ALL: [SortColumn; 6] = [
        SortColumn::Timestamp,
        SortColumn::Speed,
        SortColumn::Odometer,
        SortColumn::Soc,
        SortColumn::Elevation,
        SortColumn::ShiftState,
    ];

    /// Field name understood by the backend ordering filter
    pub fn field(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Speed => "speed",
            Self::Odometer => "odometer",
            Self::Soc => "soc",
            Self::Elevation => "elevation",
            Self::ShiftState => "shift_state",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Timestamp => "Timestamp",
            Self::Speed => "Speed",
            Self::Odometer => "Odometer",
            Self::Soc => "SOC",
            Self::Elevation => "Elevation",
            Self::ShiftState => "Shift",
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.field() == field)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Backend ordering parameter, `-` prefixed when descending
    pub fn ordering(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.column.field().to_string(),
            SortDirection::Descending => format!("-{}", self.column.field()),
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Timestamp,
            direction: SortDirection::Descending,
        }
    }
}

/// Inclusive range filter in the client's wall clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub initial: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryState {
    vehicle_id: String,
    page: u32,
    page_size: u32,
    sort: SortOrder,
    range: TimeRange,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            vehicle_id: String::new(),
            page: 1,
            page_size: normalize_page_size(page_size),
            sort: SortOrder::default(),
            range: TimeRange::default(),
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn select_vehicle(&self, vehicle_id: &str) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            page: 1,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_page_size(&self, page_size: u32) -> Self {
        Self {
            page_size: normalize_page_size(page_size),
            page: 1,
            ..self.clone()
        }
    }

    /// Same column flips direction, a new column starts ascending.
    #[must_use]
    pub fn toggle_sort(&self, column: SortColumn) -> Self {
        let direction = if self.sort.column == column {
            self.sort.direction.flipped()
        } else {
            SortDirection::Ascending
        };
        Self {
            sort: SortOrder { column, direction },
            page: 1,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_range(&self, range: TimeRange) -> Self {
        Self {
            range,
            page: 1,
            ..self.clone()
        }
    }

    pub fn to_query(&self, timezone: &Tz) -> ListQuery {
        ListQuery {
            vehicle_id: self.vehicle_id.clone(),
            page: self.page,
            page_size: self.page_size,
            initial_timestamp: self
                .range
                .initial
                .map(|t| t.format(WIRE_TIME_FORMAT).to_string()),
            final_timestamp: self
                .range
                .last
                .map(|t| t.format(WIRE_TIME_FORMAT).to_string()),
            timezone: Some(timezone.name().to_string()),
            ordering: Some(self.sort.ordering()),
        }
    }
}

fn normalize_page_size(page_size: u32) -> u32 {
    if PAGE_SIZES.contains(&page_size) {
        page_size
    } else {
        DEFAULT_PAGE_SIZE
    }
}

/// `ceil(count / page_size)`, never below one.
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    count
        .div_ceil(page_size as u64)
        .clamp(1, u32::MAX as u64) as u32
}

/// Page typed by the user, clamped to `[1, total_pages]`.
///
/// Only the leading digits count, so `2.5` is page 2 and `3abc` is page 3.
/// Input without leading digits becomes page 1.
pub fn parse_page_input(input: &str, total_pages: u32) -> u32 {
    let input = input.trim_start();
    let input = input.strip_prefix('+').unwrap_or(input);
    let digits = input
        .find(|c: char| !c.is_ascii_digit())
        .map_or(input, |end| &input[..end]);
    if digits.is_empty() {
        return 1;
    }
    // too many digits for a u64 is still past the last page
    let page = digits.parse::<u64>().unwrap_or(u64::MAX);
    page.clamp(1, total_pages.max(1) as u64) as u32
}

/// Parses a range bound typed by the user. Empty input means no bound.
pub fn parse_range_input(input: &str) -> Result<Option<NaiveDateTime>, DashboardError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    INPUT_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(Some)
        .ok_or_else(|| DashboardError::InvalidUserInput {
            field: "timestamp".to_string(),
            reason: format!("'{}' is not a date and time like 2024-03-01T08:00", input),
        })
}
