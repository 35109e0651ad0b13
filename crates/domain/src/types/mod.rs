//! Domain types for per-section import/export tracking.

pub mod events;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::SyncError;

/// Display value used when the backend has no last-import record for a
/// section.
pub const LAST_IMPORT_FALLBACK: &str = "N/A";

/// One configured import/export pipeline.
///
/// The set is fixed at compile time; the backend never creates sections
/// dynamically. Wire keys match the backend's route segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Cadastro,
    #[serde(rename = "domiciliofcd")]
    DomicilioFcd,
    Bpa,
    Visitas,
    Iaf,
    Pse,
    PseProf,
    Atendimentos,
    Fiocruz,
}

impl Section {
    /// All configured sections, in display order.
    pub const ALL: [Self; 9] = [
        Self::Cadastro,
        Self::DomicilioFcd,
        Self::Bpa,
        Self::Visitas,
        Self::Iaf,
        Self::Pse,
        Self::PseProf,
        Self::Atendimentos,
        Self::Fiocruz,
    ];

    /// Backend route segment / wire key for this section.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cadastro => "cadastro",
            Self::DomicilioFcd => "domiciliofcd",
            Self::Bpa => "bpa",
            Self::Visitas => "visitas",
            Self::Iaf => "iaf",
            Self::Pse => "pse",
            Self::PseProf => "pse_prof",
            Self::Atendimentos => "atendimentos",
            Self::Fiocruz => "fiocruz",
        }
    }

    /// Whether import requests for this section carry the billing period.
    pub fn has_billing_period(self) -> bool {
        matches!(self, Self::Bpa)
    }

    /// Whether the section produces an extractable artifact. Fiocruz is
    /// import-only.
    pub fn supports_extract(self) -> bool {
        !matches!(self, Self::Fiocruz)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = SyncError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == raw)
            .ok_or_else(|| SyncError::InvalidInput(format!("unknown section: {raw}")))
    }
}

/// Server-side task status as reported by `/task-status/<section>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Idle,
    Completed,
    Error,
    Unknown,
}

impl TaskStatus {
    /// Parse a wire value, mapping anything unrecognized to [`Self::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => Self::Running,
            "idle" => Self::Idle,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Mutable tracking state for a single section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionState {
    /// Job progress, 0..=100. Monotone within a run except explicit resets.
    pub progress: u8,
    /// An import job is executing server-side.
    pub running: bool,
    /// An export job is executing server-side.
    pub extracting: bool,
    /// Duplicate-submission guard mirrored from `running`.
    pub button_disabled: bool,
    /// A generated artifact exists for download.
    pub file_available: bool,
    /// Last error surfaced for this section; cleared on the next attempt.
    pub error_message: Option<String>,
    /// Display timestamp of the last successful import.
    pub last_import: Option<String>,
}

/// Restart-recovery flags persisted by the state cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFlags {
    pub file_available: bool,
    pub button_disabled: bool,
}

/// Counters for the address-correction sub-channel (`type = "cep"` events).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFixProgress {
    pub total_records: u64,
    pub updated_records: u64,
}

/// Auto-import schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    /// Time of day in `HH:MM`.
    pub time: String,
}

impl Default for AutoUpdateConfig {
    fn default() -> Self {
        Self { enabled: false, time: "00:00".to_string() }
    }
}

/// Reporting period for billing-file generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    /// Zero-padded month, `"01"`..=`"12"`.
    pub month: String,
}

impl BillingPeriod {
    /// The period billing files are generated for by default: the month
    /// before `today`, rolling January back to December of the previous
    /// year.
    pub fn previous_month(today: NaiveDate) -> Self {
        let (year, month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };
        Self { year, month: format!("{month:02}") }
    }
}

/// Aggregate coordinator state: one [`SectionState`] per configured section
/// plus the scalar selection fields.
///
/// Sections are stored in a fixed array indexed by discriminant, so every
/// configured section always has exactly one state and lookups cannot fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    sections: [SectionState; Section::ALL.len()],
    pub period: BillingPeriod,
    pub address_fix: AddressFixProgress,
    pub auto_update: AutoUpdateConfig,
}

impl DashboardState {
    pub fn new(period: BillingPeriod) -> Self {
        Self {
            sections: Default::default(),
            period,
            address_fix: AddressFixProgress::default(),
            auto_update: AutoUpdateConfig::default(),
        }
    }

    pub fn section(&self, section: Section) -> &SectionState {
        &self.sections[section as usize]
    }

    pub fn section_mut(&mut self, section: Section) -> &mut SectionState {
        &mut self.sections[section as usize]
    }

    /// Iterate sections in display order with their state.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &SectionState)> {
        Section::ALL.into_iter().map(move |section| (section, self.section(section)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_wire_keys_round_trip() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>(), Ok(section));
        }
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(matches!("vacinacao".parse::<Section>(), Err(SyncError::InvalidInput(_))));
    }

    #[test]
    fn section_serde_uses_wire_keys() {
        let json = serde_json::to_string(&Section::DomicilioFcd).unwrap();
        assert_eq!(json, "\"domiciliofcd\"");
        let json = serde_json::to_string(&Section::PseProf).unwrap();
        assert_eq!(json, "\"pse_prof\"");
    }

    #[test]
    fn task_status_parse_tolerates_garbage() {
        assert_eq!(TaskStatus::parse("running"), TaskStatus::Running);
        assert_eq!(TaskStatus::parse("finished"), TaskStatus::Unknown);
        assert_eq!(TaskStatus::parse(""), TaskStatus::Unknown);
    }

    #[test]
    fn previous_month_rolls_over_january() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            BillingPeriod::previous_month(jan),
            BillingPeriod { year: 2023, month: "12".to_string() }
        );

        let march = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(
            BillingPeriod::previous_month(march),
            BillingPeriod { year: 2024, month: "02".to_string() }
        );
    }

    #[test]
    fn dashboard_state_has_one_entry_per_section() {
        let state = DashboardState::new(BillingPeriod { year: 2024, month: "03".to_string() });
        assert_eq!(state.iter().count(), Section::ALL.len());
        for (_, section_state) in state.iter() {
            assert_eq!(*section_state, SectionState::default());
        }
    }
}
