//! Presentational state owned by controllers.
//!
//! Never persisted and never reconciled.

/// An open/closed flag for menus and panels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggle(bool);

impl Toggle {
    pub fn is_open(self) -> bool {
        self.0
    }

    pub fn toggle(&mut self) {
        self.0 = !self.0;
    }

    pub fn close(&mut self) {
        self.0 = false;
    }
}

/// Tabs of the doctor dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DoctorTab {
    #[default]
    Overview,
    Patients,
    Reviews,
    Messages,
}

/// Menus and panels of the doctor dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoctorUiState {
    pub tab: DoctorTab,
    pub user_menu: Toggle,
    pub fab_menu: Toggle,
    pub notifications: Toggle,
}

impl DoctorUiState {
    /// Switching tabs closes every overlay.
    pub fn select_tab(&mut self, tab: DoctorTab) {
        self.tab = tab;
        self.user_menu.close();
        self.fab_menu.close();
        self.notifications.close();
    }
}
