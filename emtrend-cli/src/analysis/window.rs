use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::AnalysisError;

/// Période d'analyse, relative à une date de référence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Window {
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "10years")]
    TenYears,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl Window {
    pub const STANDARD: [Window; 4] = [Window::ThreeMonths, Window::SixMonths, Window::Year, Window::All];

    pub fn days(&self) -> Option<i64> {
        match self {
            Window::ThreeMonths => Some(91),
            Window::SixMonths => Some(182),
            Window::Year => Some(365),
            Window::TenYears => Some(3650),
            Window::All => None,
        }
    }

    /// Première date incluse dans la fenêtre, `None` si la fenêtre est illimitée.
    pub fn since(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.days().map(|days| today - Duration::days(days))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::ThreeMonths => "3months",
            Window::SixMonths => "6months",
            Window::Year => "year",
            Window::TenYears => "10years",
            Window::All => "all",
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3months" | "3m" => Ok(Window::ThreeMonths),
            "6months" | "6m" => Ok(Window::SixMonths),
            "year" | "1y" => Ok(Window::Year),
            "10years" | "10y" => Ok(Window::TenYears),
            "all" => Ok(Window::All),
            _ => Err(AnalysisError::InvalidWindow(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_windows() {
        assert_eq!("3months".parse::<Window>().unwrap(), Window::ThreeMonths);
        assert_eq!("6months".parse::<Window>().unwrap(), Window::SixMonths);
        assert_eq!("YEAR".parse::<Window>().unwrap(), Window::Year);
        assert_eq!("10y".parse::<Window>().unwrap(), Window::TenYears);
        assert_eq!(" all ".parse::<Window>().unwrap(), Window::All);
    }

    #[test]
    fn test_parse_unknown_window_is_error() {
        let err = "fortnight".parse::<Window>().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidWindow(ref s) if s == "fortnight"));
        assert!("".parse::<Window>().is_err());
    }

    #[test]
    fn test_since() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(Window::All.since(today), None);
        assert_eq!(Window::Year.since(today), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(Window::ThreeMonths.since(today), NaiveDate::from_ymd_opt(2024, 10, 1));
    }

    #[test]
    fn test_display_roundtrip() {
        for window in [Window::ThreeMonths, Window::SixMonths, Window::Year, Window::TenYears, Window::All] {
            assert_eq!(window.to_string().parse::<Window>().unwrap(), window);
        }
    }
}
