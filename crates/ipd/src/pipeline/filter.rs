use super::domain::{ActivityRecord, InvalidMonth, Month, NormalizedTable};
use serde::Serialize;

/// Selector value meaning "no filter" in query strings and CLI flags.
pub const ALL_SELECTION: &str = "All";

/// Month/state selection threaded through every pipeline call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterParams {
    pub month: Option<Month>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid month filter: {0}")]
    Month(#[from] InvalidMonth),
}

impl FilterParams {
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds params from user-facing selectors where absence, blanks and
    /// `All` all mean "no filter".
    pub fn from_selection(month: Option<&str>, state: Option<&str>) -> Result<Self, FilterError> {
        let month = selected(month).map(str::parse::<Month>).transpose()?;
        let state = selected(state).map(str::to_string);
        Ok(Self { month, state })
    }

    pub fn is_unfiltered(&self) -> bool {
        self.month.is_none() && self.state.is_none()
    }

    pub fn matches(&self, record: &ActivityRecord) -> bool {
        let month_ok = self.month.map_or(true, |month| record.month == Some(month));
        let state_ok = self
            .state
            .as_deref()
            .map_or(true, |state| record.state == state);
        month_ok && state_ok
    }
}

fn selected(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(ALL_SELECTION))
}

/// Returns the rows of `table` matching `params`; `table` is left untouched.
pub fn apply(table: &NormalizedTable, params: &FilterParams) -> NormalizedTable {
    if params.is_unfiltered() {
        return table.clone();
    }
    let records = table
        .records()
        .iter()
        .filter(|record| params.matches(record))
        .cloned()
        .collect();
    NormalizedTable::with_records(table.kind(), table.columns().to_vec(), records)
}
