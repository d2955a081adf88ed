use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Period of interest for membership resolution.
///
/// Each bound is independently optional; an absent bound is unbounded on
/// that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ObservationWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// No bounds: every event is in the window.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Everything since `start`.
    pub fn since(start: NaiveDate) -> Self {
        Self::new(Some(start), None)
    }

    /// Everything up to `end`.
    pub fn until(end: NaiveDate) -> Self {
        Self::new(None, Some(end))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl fmt::Display for ObservationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |d: Option<NaiveDate>| d.map_or_else(|| "..".to_string(), |d| d.to_string());
        write!(f, "[{}, {})", bound(self.start), bound(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        assert!(ObservationWindow::default().is_unbounded());
        let until = ObservationWindow::until(NaiveDate::from_ymd_opt(2004, 1, 1).unwrap());
        assert!(!until.is_unbounded());
    }

    #[test]
    fn display_marks_open_sides() {
        let w = ObservationWindow::since(NaiveDate::from_ymd_opt(2009, 1, 1).unwrap());
        assert_eq!(w.to_string(), "[2009-01-01, ..)");
    }
}
