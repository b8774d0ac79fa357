use crate::table::Row;

pub const LOCATION_FILTER: &str = "location-filter";
pub const RATE_FILTER: &str = "rate-filter";

pub const RATE_HIGH_THRESHOLD: f64 = 40.0;
pub const RATE_LOW_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBucket {
    High,
    Medium,
    Low,
}

impl RateBucket {
    pub const ALL: [RateBucket; 3] = [RateBucket::High, RateBucket::Medium, RateBucket::Low];

    pub fn value(self) -> &'static str {
        match self {
            RateBucket::High => "high",
            RateBucket::Medium => "medium",
            RateBucket::Low => "low",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.value() == value)
    }
}

/// Boundaries of the admission-rate buckets, in percent.
///
/// `high` is `>= high_min`, `medium` is `[low_max, high_min)` and `low` is
/// `< low_max`. Option labels and the predicate both read these values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBuckets {
    pub high_min: f64,
    pub low_max: f64,
}

impl Default for RateBuckets {
    fn default() -> Self {
        RateBuckets {
            high_min: RATE_HIGH_THRESHOLD,
            low_max: RATE_LOW_THRESHOLD,
        }
    }
}

impl RateBuckets {
    /// `None` for `NaN`, which belongs to no bucket.
    pub fn bucket_of(&self, rate: f64) -> Option<RateBucket> {
        if rate.is_nan() {
            None
        } else if rate >= self.high_min {
            Some(RateBucket::High)
        } else if rate >= self.low_max {
            Some(RateBucket::Medium)
        } else {
            Some(RateBucket::Low)
        }
    }

    pub fn label(&self, bucket: RateBucket) -> String {
        match bucket {
            RateBucket::High => format!("{}%以上", self.high_min),
            RateBucket::Medium => format!("{}-{}%", self.low_max, self.high_min),
            RateBucket::Low => format!("{}%以下", self.low_max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    pub value: String,
    pub text: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FilterKind {
    /// Keep rows whose cell text contains the selected value.
    Contains { column: usize },
    /// Keep rows whose parsed rate falls into the selected bucket.
    RateBucket { column: usize, buckets: RateBuckets },
}

/// One selector control of the filter bar.
#[derive(Debug, Clone)]
pub struct FilterControl {
    pub name: String,
    pub label: String,
    pub options: Vec<FilterOption>,
    pub selected: String,
    pub kind: FilterKind,
}

impl FilterControl {
    pub fn location(column: usize, label: impl Into<String>, locations: &[String]) -> Self {
        let mut options = vec![FilterOption::new("", "全部地区")];
        options.extend(locations.iter().map(|l| FilterOption::new(l.as_str(), l.as_str())));
        Self {
            name: LOCATION_FILTER.to_string(),
            label: label.into(),
            options,
            selected: String::new(),
            kind: FilterKind::Contains { column },
        }
    }

    pub fn rate(column: usize, label: impl Into<String>, buckets: RateBuckets) -> Self {
        let mut options = vec![FilterOption::new("", "全部录取率")];
        options.extend(
            RateBucket::ALL
                .into_iter()
                .map(|b| FilterOption::new(b.value(), buckets.label(b))),
        );
        Self {
            name: RATE_FILTER.to_string(),
            label: label.into(),
            options,
            selected: String::new(),
            kind: FilterKind::RateBucket { column, buckets },
        }
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    pub fn selected_position(&self) -> usize {
        self.options
            .iter()
            .position(|o| o.value == self.selected)
            .unwrap_or(0)
    }

    pub fn selected_text(&self) -> &str {
        self.options
            .get(self.selected_position())
            .map(|o| o.text.as_str())
            .unwrap_or("")
    }

    /// Keep decision for one row. An inactive control keeps everything.
    pub fn keep(&self, row: &Row, rate_of: impl Fn(&Row, usize) -> f64) -> bool {
        if !self.is_active() {
            return true;
        }
        match &self.kind {
            FilterKind::Contains { column } => row
                .cell(*column)
                .is_some_and(|text| text.contains(self.selected.as_str())),
            FilterKind::RateBucket { column, buckets } => {
                let wanted = RateBucket::from_value(&self.selected);
                wanted.is_some() && buckets.bucket_of(rate_of(row, *column)) == wanted
            }
        }
    }
}
