//! The progress reducer: a pure transition function over
//! [`DashboardState`].
//!
//! Every state mutation in the system goes through [`apply`], so transitions
//! stay auditable and testable in isolation. Each action updates exactly the
//! named fields of exactly the named section (or the global scalars) and
//! nothing else.

use esusync_domain::{DashboardState, Section};

/// A single state transition.
///
/// Sections are typed, so an action can never name an unconfigured section;
/// tolerance for unknown wire keys lives at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetProgress { section: Section, value: u8 },
    SetError { section: Section, message: Option<String> },
    SetButtonDisabled { section: Section, value: bool },
    SetRunning { section: Section, value: bool },
    SetExtracting { section: Section, value: bool },
    SetFileAvailable { section: Section, value: bool },
    SetLastImport { section: Section, value: String },
    SetPeriod { year: i32, month: String },
    SetAddressFixProgress { total: u64, updated: u64 },
    SetAutoUpdate { enabled: bool, time: String },
}

/// Apply one action to the state.
pub fn apply(state: &mut DashboardState, action: Action) {
    match action {
        Action::SetProgress { section, value } => {
            state.section_mut(section).progress = value.min(100);
        }
        Action::SetError { section, message } => {
            state.section_mut(section).error_message = message;
        }
        Action::SetButtonDisabled { section, value } => {
            state.section_mut(section).button_disabled = value;
        }
        Action::SetRunning { section, value } => {
            state.section_mut(section).running = value;
        }
        Action::SetExtracting { section, value } => {
            state.section_mut(section).extracting = value;
        }
        Action::SetFileAvailable { section, value } => {
            state.section_mut(section).file_available = value;
        }
        Action::SetLastImport { section, value } => {
            state.section_mut(section).last_import = Some(value);
        }
        Action::SetPeriod { year, month } => {
            state.period.year = year;
            state.period.month = month;
        }
        Action::SetAddressFixProgress { total, updated } => {
            state.address_fix.total_records = total;
            state.address_fix.updated_records = updated;
        }
        Action::SetAutoUpdate { enabled, time } => {
            state.auto_update.enabled = enabled;
            state.auto_update.time = time;
        }
    }
}

#[cfg(test)]
mod tests {
    use esusync_domain::BillingPeriod;

    use super::*;

    fn fresh_state() -> DashboardState {
        DashboardState::new(BillingPeriod { year: 2024, month: "03".to_string() })
    }

    #[test]
    fn set_progress_updates_only_that_section() {
        let mut state = fresh_state();
        apply(&mut state, Action::SetProgress { section: Section::Bpa, value: 42 });

        assert_eq!(state.section(Section::Bpa).progress, 42);
        for (section, section_state) in state.iter() {
            if section != Section::Bpa {
                assert_eq!(section_state.progress, 0, "section {section} was mutated");
            }
            // Only the progress field may change.
            assert!(!section_state.running);
            assert!(!section_state.file_available);
            assert!(section_state.error_message.is_none());
        }
    }

    #[test]
    fn set_progress_clamps_to_100() {
        let mut state = fresh_state();
        apply(&mut state, Action::SetProgress { section: Section::Visitas, value: 250 });
        assert_eq!(state.section(Section::Visitas).progress, 100);
    }

    #[test]
    fn set_error_and_clear() {
        let mut state = fresh_state();
        apply(
            &mut state,
            Action::SetError {
                section: Section::Cadastro,
                message: Some("DB timeout".to_string()),
            },
        );
        assert_eq!(state.section(Section::Cadastro).error_message.as_deref(), Some("DB timeout"));

        apply(&mut state, Action::SetError { section: Section::Cadastro, message: None });
        assert!(state.section(Section::Cadastro).error_message.is_none());
    }

    #[test]
    fn set_period_touches_only_scalars() {
        let mut state = fresh_state();
        apply(&mut state, Action::SetPeriod { year: 2025, month: "01".to_string() });

        assert_eq!(state.period.year, 2025);
        assert_eq!(state.period.month, "01");
        for (_, section_state) in state.iter() {
            assert_eq!(*section_state, Default::default());
        }
    }

    #[test]
    fn address_fix_counters_do_not_touch_sections() {
        let mut state = fresh_state();
        apply(&mut state, Action::SetAddressFixProgress { total: 120, updated: 37 });

        assert_eq!(state.address_fix.total_records, 120);
        assert_eq!(state.address_fix.updated_records, 37);
        for (_, section_state) in state.iter() {
            assert_eq!(section_state.progress, 0);
        }
    }

    #[test]
    fn actions_for_one_section_never_leak_into_another() {
        let mut state = fresh_state();
        apply(&mut state, Action::SetRunning { section: Section::Iaf, value: true });
        apply(&mut state, Action::SetFileAvailable { section: Section::Pse, value: true });
        apply(
            &mut state,
            Action::SetLastImport { section: Section::Visitas, value: "10:00 01-03-2024".into() },
        );

        assert!(state.section(Section::Iaf).running);
        assert!(!state.section(Section::Pse).running);
        assert!(state.section(Section::Pse).file_available);
        assert!(!state.section(Section::Iaf).file_available);
        assert!(state.section(Section::Visitas).last_import.is_some());
        assert!(state.section(Section::Atendimentos).last_import.is_none());
    }
}
