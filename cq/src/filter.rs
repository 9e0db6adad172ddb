//! Per-request hit filters

use std::num::ParseIntError;

/// Inclusive time bounds; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFilter {
    pub begin: Option<i64>,
    pub end: Option<i64>,
}

impl TimeFilter {
    pub fn new(begin: Option<i64>, end: Option<i64>) -> Self {
        Self { begin, end }
    }

    pub fn is_active(&self) -> bool {
        self.begin.is_some() || self.end.is_some()
    }

    /// Whether a hit with timestamp `value` passes. The value is only parsed
    /// when a bound is set; a hit without a timestamp fails any bound.
    pub fn accepts(&self, value: Option<&str>) -> Result<bool, ParseIntError> {
        if !self.is_active() {
            return Ok(true);
        }
        let Some(value) = value else {
            return Ok(false);
        };
        let time: i64 = value.trim().parse()?;
        Ok(self.begin.is_none_or(|b| b <= time) && self.end.is_none_or(|e| time <= e))
    }
}

/// Allow-list of board values; an empty list lets everything through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    allowed: Vec<String>,
}

impl BoardFilter {
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.allowed.is_empty()
    }

    pub fn accepts(&self, board: Option<&str>) -> bool {
        if !self.is_active() {
            return true;
        }
        board.is_some_and(|b| self.allowed.iter().any(|a| a == b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_is_inclusive() {
        let filter = TimeFilter::new(Some(100), Some(200));
        assert!(filter.accepts(Some("100")).unwrap());
        assert!(filter.accepts(Some("200")).unwrap());
        assert!(filter.accepts(Some(" 150 ")).unwrap());
        assert!(!filter.accepts(Some("99")).unwrap());
        assert!(!filter.accepts(Some("201")).unwrap());
    }

    #[test]
    fn test_time_one_sided() {
        let from = TimeFilter::new(Some(100), None);
        assert!(from.accepts(Some("100")).unwrap());
        assert!(from.accepts(Some("9999999999")).unwrap());
        assert!(!from.accepts(Some("-5")).unwrap());

        let until = TimeFilter::new(None, Some(100));
        assert!(until.accepts(Some("100")).unwrap());
        assert!(until.accepts(Some("-5")).unwrap());
        assert!(!until.accepts(Some("101")).unwrap());
    }

    #[test]
    fn test_time_inactive_ignores_value() {
        let filter = TimeFilter::default();
        assert!(!filter.is_active());
        assert!(filter.accepts(Some("not a number")).unwrap());
        assert!(filter.accepts(None).unwrap());
    }

    #[test]
    fn test_time_missing_or_bad_value() {
        let filter = TimeFilter::new(Some(0), None);
        assert!(!filter.accepts(None).unwrap());
        assert!(filter.accepts(Some("2019-01-01")).is_err());
    }

    #[test]
    fn test_board_filter() {
        let filter = BoardFilter::new(&["sports".to_string(), "news".to_string()]);
        assert!(filter.accepts(Some("sports")));
        assert!(filter.accepts(Some("news")));
        assert!(!filter.accepts(Some("pets")));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn test_empty_board_list_disables_filtering() {
        let filter = BoardFilter::new(&[]);
        assert!(!filter.is_active());
        assert!(filter.accepts(Some("anything")));
        assert!(filter.accepts(None));
    }
}
