use std::cmp::Ordering;

use derive_setters::Setters;
use pinyin::ToPinyin;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::filter::RateBuckets;

pub const DEFAULT_RATING_MARKER: char = '★';

/// Tokens meaning "approximately" that may lead a rate cell.
pub const DEFAULT_QUALIFIERS: [&str; 4] = ["约", "approximately", "~", "≈"];

pub const DEFAULT_LOCATIONS: [&str; 5] = ["合肥市", "六安市", "滁州市", "宿州市", "淮北市"];

// Ends each pinyin syllable so "he fei" sorts before "hei ..."
const SYLLABLE_END: char = '\u{1}';

/// Names the columns that get special treatment when a table is attached.
/// Columns are matched by their header text.
#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct ColumnLayout {
    pub rate_column: String,
    pub rating_column: String,
    pub rating_marker: char,
    pub location_column: String,
    pub locations: Vec<String>,
    pub qualifiers: Vec<String>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            rate_column: "录取率".to_string(),
            rating_column: "交通便捷度".to_string(),
            rating_marker: DEFAULT_RATING_MARKER,
            location_column: "地理位置".to_string(),
            locations: DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect(),
            qualifiers: DEFAULT_QUALIFIERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Percentages like `45%` or `约 38%`, bucketed by the attached thresholds.
    Rate {
        qualifiers: Vec<String>,
        buckets: RateBuckets,
    },
    /// Repeated marker glyphs, compared by how many there are.
    Rating { marker: char },
    Numeric,
    Text,
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub idx: usize,
    pub name: String,
    pub kind: ColumnKind,
    pub sortable: bool,
}

/// Comparable value derived from one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Missing,
    Number(f64),
    Count(usize),
    Text { collated: String, raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl ColumnDescriptor {
    pub fn new(idx: usize, name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            idx,
            name: name.into(),
            kind,
            // The first column holds the row identity (institution name)
            sortable: idx != 0,
        }
    }

    pub fn sort_key(&self, cell: Option<&str>) -> SortKey {
        let Some(text) = cell else {
            return SortKey::Missing;
        };
        match &self.kind {
            ColumnKind::Rate { qualifiers, .. } => SortKey::Number(parse_rate(text, qualifiers)),
            ColumnKind::Rating { marker } => SortKey::Count(count_markers(text, *marker)),
            ColumnKind::Numeric => SortKey::Number(text.trim().parse().unwrap_or(f64::NAN)),
            ColumnKind::Text => {
                let raw = text.trim().to_string();
                SortKey::Text {
                    collated: collation_key(&raw),
                    raw,
                }
            }
        }
    }

    /// Numeric percentage of a rate cell, `NaN` for non-rate columns.
    pub fn rate(&self, cell: Option<&str>) -> f64 {
        match (&self.kind, cell) {
            (ColumnKind::Rate { qualifiers, .. }, Some(text)) => parse_rate(text, qualifiers),
            _ => f64::NAN,
        }
    }

    pub fn buckets(&self) -> Option<&RateBuckets> {
        match &self.kind {
            ColumnKind::Rate { buckets, .. } => Some(buckets),
            _ => None,
        }
    }
}

/// Strip a trailing `%` and a leading qualifier, then parse as a float.
/// Anything that does not parse yields `NaN`.
pub fn parse_rate(text: &str, qualifiers: &[String]) -> f64 {
    let mut value = text.trim();
    value = value.strip_suffix('%').unwrap_or(value).trim_end();
    for q in qualifiers {
        if let Some(rest) = value.strip_prefix(q.as_str()) {
            value = rest.trim_start();
            break;
        }
    }
    value.parse().unwrap_or(f64::NAN)
}

pub fn count_markers(text: &str, marker: char) -> usize {
    text.chars().filter(|&c| c == marker).count()
}

/// Collation key for text cells: Han characters spell out their pinyin,
/// everything else is decomposed, stripped of combining marks and lowercased.
pub fn collation_key(s: &str) -> String {
    let mut key = String::with_capacity(s.len() * 2);
    for c in s.nfkd().filter(|c| !is_combining_mark(*c)) {
        match c.to_pinyin() {
            Some(syllable) => {
                key.push_str(syllable.plain());
                key.push(SYLLABLE_END);
            }
            None => key.extend(c.to_lowercase()),
        }
    }
    key
}

/// Order two keys of the same column.
///
/// Missing cells are the lowest value, so they lead an ascending sort and
/// trail a descending one. `NaN` trails all valid numbers in both directions.
pub fn compare_keys(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    match (a, b) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => direction.apply(Ordering::Less),
        (_, SortKey::Missing) => direction.apply(Ordering::Greater),
        (SortKey::Number(x), SortKey::Number(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => direction.apply(x.partial_cmp(y).unwrap_or(Ordering::Equal)),
        },
        (SortKey::Count(x), SortKey::Count(y)) => direction.apply(x.cmp(y)),
        (
            SortKey::Text {
                collated: fa,
                raw: ra,
            },
            SortKey::Text {
                collated: fb,
                raw: rb,
            },
        ) => direction.apply(fa.cmp(fb).then_with(|| ra.cmp(rb))),
        // A column only ever produces one kind of key besides Missing
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualifiers() -> Vec<String> {
        ColumnLayout::default().qualifiers
    }

    fn rate_column() -> ColumnDescriptor {
        ColumnDescriptor::new(
            5,
            "录取率",
            ColumnKind::Rate {
                qualifiers: qualifiers(),
                buckets: RateBuckets::default(),
            },
        )
    }

    #[test]
    fn parse_rate_strips_percent_and_qualifier() {
        let q = qualifiers();
        assert_eq!(parse_rate("45%", &q), 45.0);
        assert_eq!(parse_rate("约 38%", &q), 38.0);
        assert_eq!(parse_rate("约38%", &q), 38.0);
        assert_eq!(parse_rate(" approximately 12.5 % ", &q), 12.5);
        assert_eq!(parse_rate("20", &q), 20.0);
    }

    #[test]
    fn parse_rate_yields_nan_for_garbage() {
        let q = qualifiers();
        assert!(parse_rate("n/a", &q).is_nan());
        assert!(parse_rate("", &q).is_nan());
        assert!(parse_rate("%", &q).is_nan());
    }

    #[test]
    fn markers_are_counted() {
        assert_eq!(count_markers("★★★☆☆", '★'), 3);
        assert_eq!(count_markers("☆☆☆☆☆", '★'), 0);
        assert_eq!(count_markers("", '★'), 0);
    }

    #[test]
    fn identity_column_is_not_sortable() {
        assert!(!ColumnDescriptor::new(0, "院校名称", ColumnKind::Text).sortable);
        assert!(ColumnDescriptor::new(1, "地理位置", ColumnKind::Text).sortable);
    }

    #[test]
    fn nan_trails_valid_numbers_in_both_directions() {
        let nan = SortKey::Number(f64::NAN);
        let one = SortKey::Number(1.0);
        for dir in [SortDirection::Ascending, SortDirection::Descending] {
            assert_eq!(compare_keys(&nan, &one, dir), Ordering::Greater);
            assert_eq!(compare_keys(&one, &nan, dir), Ordering::Less);
        }
    }

    #[test]
    fn missing_is_the_lowest_value() {
        let missing = SortKey::Missing;
        let nan = SortKey::Number(f64::NAN);
        let one = SortKey::Number(1.0);
        assert_eq!(
            compare_keys(&missing, &one, SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_keys(&missing, &nan, SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_keys(&missing, &one, SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn rate_column_keys() {
        let col = rate_column();
        assert_eq!(col.sort_key(Some("约 38%")), SortKey::Number(38.0));
        assert_eq!(col.sort_key(None), SortKey::Missing);
        assert_eq!(col.rate(Some("45%")), 45.0);
        assert!(col.buckets().is_some());
    }

    #[test]
    fn text_keys_fold_case_and_accents() {
        let col = ColumnDescriptor::new(3, "类型", ColumnKind::Text);
        let a = col.sort_key(Some("  École "));
        let b = col.sort_key(Some("ecole"));
        let c = col.sort_key(Some("fac"));
        // Same collation key, raw text decides
        assert_eq!(
            compare_keys(&a, &b, SortDirection::Ascending),
            "École".cmp("ecole")
        );
        assert_eq!(compare_keys(&a, &c, SortDirection::Ascending), Ordering::Less);
        assert_eq!(compare_keys(&b, &c, SortDirection::Descending), Ordering::Greater);
    }

    #[test]
    fn chinese_text_collates_by_pinyin() {
        let col = ColumnDescriptor::new(1, "地理位置", ColumnKind::Text);
        let mut cities = vec!["六安市", "合肥市", "宿州市", "淮北市", "滁州市"];
        cities.sort_by(|a, b| {
            compare_keys(
                &col.sort_key(Some(a)),
                &col.sort_key(Some(b)),
                SortDirection::Ascending,
            )
        });
        assert_eq!(cities, vec!["滁州市", "合肥市", "淮北市", "六安市", "宿州市"]);
    }

    #[test]
    fn syllables_compare_one_at_a_time() {
        // he fei < hei long
        assert!(collation_key("合肥") < collation_key("黑龙"));
        assert_eq!(collation_key("École"), "ecole");
    }

    #[test]
    fn numeric_column_parses_plain_numbers() {
        let col = ColumnDescriptor::new(4, "学费", ColumnKind::Numeric);
        assert_eq!(col.sort_key(Some(" 4800 ")), SortKey::Number(4800.0));
        match col.sort_key(Some("free")) {
            SortKey::Number(n) => assert!(n.is_nan()),
            other => panic!("unexpected key {other:?}"),
        }
    }
}
