//! Core types for alert thresholds.
//!
//! - [`AlertKind`]: the monitored metric an alert applies to
//! - [`AlertThreshold`]: the desired state of one alert on one system
//! - [`AlertForm`]: the starting values of an alert editor

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vigil_store::AlertRecord;

use crate::error::{AlertError, Result};

/// Threshold shown for a new alert.
pub const DEFAULT_VALUE: f64 = 80.0;

/// Sustained duration, in minutes, shown for a new alert.
pub const DEFAULT_MIN: u32 = 10;

/// Accepted threshold values.
pub const VALUE_RANGE: RangeInclusive<f64> = 1.0..=99.0;

/// Accepted sustained durations in minutes.
pub const MIN_RANGE: RangeInclusive<u32> = 1..=60;

/// The metric category an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// The system went up or down.
    Status,
    /// CPU usage.
    #[serde(rename = "CPU")]
    Cpu,
    /// Memory usage.
    Memory,
    /// Disk usage.
    Disk,
    /// Network bandwidth.
    Bandwidth,
    /// Sensor temperature.
    Temperature,
}

impl AlertKind {
    /// Every alert kind, in display order.
    pub const ALL: [Self; 6] = [
        Self::Status,
        Self::Cpu,
        Self::Memory,
        Self::Disk,
        Self::Bandwidth,
        Self::Temperature,
    ];

    /// Returns the name stored in alert records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Disk => "Disk",
            Self::Bandwidth => "Bandwidth",
            Self::Temperature => "Temperature",
        }
    }

    /// Returns a human-readable title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Cpu => "CPU Usage",
            Self::Memory => "Memory Usage",
            Self::Disk => "Disk Usage",
            Self::Bandwidth => "Bandwidth",
            Self::Temperature => "Temperature",
        }
    }

    /// Returns a one-line description of when the alert fires.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Status => "Triggers when status switches between up and down",
            Self::Cpu => "Triggers when CPU usage exceeds a threshold",
            Self::Memory => "Triggers when memory usage exceeds a threshold",
            Self::Disk => "Triggers when usage of any disk exceeds a threshold",
            Self::Bandwidth => "Triggers when combined up/down exceeds a threshold",
            Self::Temperature => "Triggers when any sensor exceeds a threshold",
        }
    }

    /// Returns the unit of the threshold value.
    #[must_use]
    pub const fn unit(&self) -> &'static str {
        match self {
            Self::Status => "",
            Self::Cpu | Self::Memory | Self::Disk => "%",
            Self::Bandwidth => " MB/s",
            Self::Temperature => "°C",
        }
    }

    /// Returns true if the alert carries a value and a duration.
    ///
    /// `Status` is a plain on/off switch.
    #[must_use]
    pub const fn has_thresholds(&self) -> bool {
        !matches!(self, Self::Status)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AlertError::UnknownKind {
                name: s.to_string(),
            })
    }
}

/// Desired state of one alert kind on a system.
///
/// Every write derived from a threshold resets the record's `triggered`
/// flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    /// Whether the alert should exist.
    pub enabled: bool,
    /// Threshold value.
    pub value: f64,
    /// Minutes the threshold must be exceeded.
    pub min: u32,
}

impl AlertThreshold {
    /// An enabled alert with the given threshold.
    #[must_use]
    pub const fn enabled(value: f64, min: u32) -> Self {
        Self {
            enabled: true,
            value,
            min,
        }
    }

    /// A disabled alert.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            value: 0.0,
            min: 0,
        }
    }

    /// Checks the threshold against the ranges accepted for `kind`.
    ///
    /// Disabled thresholds and switch-only kinds are always valid.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidThreshold` if the value or duration is
    /// out of range.
    pub fn validate(&self, kind: AlertKind) -> Result<()> {
        if !self.enabled || !kind.has_thresholds() {
            return Ok(());
        }

        if !self.value.is_finite() || !VALUE_RANGE.contains(&self.value) {
            return Err(AlertError::InvalidThreshold {
                reason: format!(
                    "value {} outside {}..={}",
                    self.value,
                    VALUE_RANGE.start(),
                    VALUE_RANGE.end()
                ),
            });
        }

        if !MIN_RANGE.contains(&self.min) {
            return Err(AlertError::InvalidThreshold {
                reason: format!(
                    "duration {} minutes outside {}..={}",
                    self.min,
                    MIN_RANGE.start(),
                    MIN_RANGE.end()
                ),
            });
        }

        Ok(())
    }

    /// Returns the `(value, min)` pair written for `kind`.
    ///
    /// Switch-only kinds always write zeros.
    #[must_use]
    pub fn written_fields(&self, kind: AlertKind) -> (f64, u32) {
        if kind.has_thresholds() {
            (self.value, self.min)
        } else {
            (0.0, 0)
        }
    }
}

/// Starting values of an alert editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertForm {
    /// Whether the switch starts on.
    pub checked: bool,
    /// Starting threshold value.
    pub value: f64,
    /// Starting duration in minutes.
    pub min: u32,
}

impl AlertForm {
    /// Form for one system, seeded from its existing alert if any.
    #[must_use]
    pub fn for_system(kind: AlertKind, existing: Option<&AlertRecord>) -> Self {
        let blank = Self::blank(kind);
        match existing {
            Some(alert) => Self {
                checked: true,
                value: if alert.value.abs() < f64::EPSILON {
                    blank.value
                } else {
                    alert.value
                },
                min: if alert.min == 0 { 1 } else { alert.min },
            },
            None => blank,
        }
    }

    /// Form for the "apply to all systems" panel, which always starts off.
    #[must_use]
    pub fn blank(kind: AlertKind) -> Self {
        if kind.has_thresholds() {
            Self {
                checked: false,
                value: DEFAULT_VALUE,
                min: DEFAULT_MIN,
            }
        } else {
            Self {
                checked: false,
                value: 0.0,
                min: 0,
            }
        }
    }

    /// The threshold this form would submit.
    #[must_use]
    pub const fn threshold(&self) -> AlertThreshold {
        AlertThreshold {
            enabled: self.checked,
            value: self.value,
            min: self.min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(value: f64, min: u32) -> AlertRecord {
        AlertRecord {
            id: "a1".into(),
            system: "s1".into(),
            name: "CPU".into(),
            value,
            min,
            triggered: true,
            user: None,
        }
    }

    mod kind_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("CPU", AlertKind::Cpu ; "wire name")]
        #[test_case("cpu", AlertKind::Cpu ; "lowercase")]
        #[test_case("Status", AlertKind::Status ; "status")]
        #[test_case("temperature", AlertKind::Temperature ; "temperature")]
        fn parse_kind(input: &str, expected: AlertKind) {
            assert_eq!(input.parse::<AlertKind>().unwrap(), expected);
        }

        #[test]
        fn parse_unknown_kind() {
            let err = "gpu".parse::<AlertKind>().unwrap_err();
            assert!(matches!(err, AlertError::UnknownKind { name } if name == "gpu"));
        }

        #[test]
        fn serde_uses_wire_names() {
            assert_eq!(serde_json::to_string(&AlertKind::Cpu).unwrap(), "\"CPU\"");
            let kind: AlertKind = serde_json::from_str("\"Bandwidth\"").unwrap();
            assert_eq!(kind, AlertKind::Bandwidth);
        }

        #[test]
        fn display_matches_as_str() {
            for kind in AlertKind::ALL {
                assert_eq!(kind.to_string(), kind.as_str());
            }
        }

        #[test]
        fn only_status_is_switch_only() {
            let switch_only: Vec<_> = AlertKind::ALL
                .into_iter()
                .filter(|k| !k.has_thresholds())
                .collect();
            assert_eq!(switch_only, vec![AlertKind::Status]);
        }
    }

    mod threshold_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(80.0, 10, true ; "defaults")]
        #[test_case(1.0, 1, true ; "lower bounds")]
        #[test_case(99.0, 60, true ; "upper bounds")]
        #[test_case(0.0, 10, false ; "value too low")]
        #[test_case(100.0, 10, false ; "value too high")]
        #[test_case(80.0, 0, false ; "duration too short")]
        #[test_case(80.0, 61, false ; "duration too long")]
        #[test_case(f64::NAN, 10, false ; "not a number")]
        fn validate_enabled(value: f64, min: u32, ok: bool) {
            let threshold = AlertThreshold::enabled(value, min);
            assert_eq!(threshold.validate(AlertKind::Cpu).is_ok(), ok);
        }

        #[test]
        fn disabled_is_always_valid() {
            assert!(AlertThreshold::disabled().validate(AlertKind::Disk).is_ok());
        }

        #[test]
        fn switch_only_ignores_ranges() {
            let threshold = AlertThreshold::enabled(0.0, 0);
            assert!(threshold.validate(AlertKind::Status).is_ok());
            assert_eq!(threshold.written_fields(AlertKind::Status), (0.0, 0));
        }

        #[test]
        fn written_fields_keep_thresholds() {
            let threshold = AlertThreshold::enabled(75.0, 5);
            assert_eq!(threshold.written_fields(AlertKind::Memory), (75.0, 5));
        }
    }

    mod form_tests {
        use super::*;

        #[test]
        fn blank_threshold_form() {
            let form = AlertForm::blank(AlertKind::Cpu);
            assert!(!form.checked);
            assert!((form.value - DEFAULT_VALUE).abs() < f64::EPSILON);
            assert_eq!(form.min, DEFAULT_MIN);
        }

        #[test]
        fn blank_switch_form() {
            let form = AlertForm::blank(AlertKind::Status);
            assert_eq!(form.min, 0);
            assert!(form.value.abs() < f64::EPSILON);
        }

        #[test]
        fn system_form_uses_existing_alert() {
            let form = AlertForm::for_system(AlertKind::Cpu, Some(&alert(65.0, 3)));
            assert!(form.checked);
            assert!((form.value - 65.0).abs() < f64::EPSILON);
            assert_eq!(form.min, 3);
        }

        #[test]
        fn system_form_defaults_zero_duration_to_one() {
            let form = AlertForm::for_system(AlertKind::Cpu, Some(&alert(65.0, 0)));
            assert_eq!(form.min, 1);
        }

        #[test]
        fn system_form_without_alert_is_blank() {
            let form = AlertForm::for_system(AlertKind::Disk, None);
            assert_eq!(form, AlertForm::blank(AlertKind::Disk));
        }

        #[test]
        fn form_threshold_carries_switch() {
            let form = AlertForm::blank(AlertKind::Cpu);
            assert!(!form.threshold().enabled);
        }
    }
}
