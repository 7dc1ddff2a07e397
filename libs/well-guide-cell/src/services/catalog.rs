use std::collections::BTreeMap;

use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::WellGuideError;

/// Recurrence periods, in whole months, for the guides shipped with the app.
const BUILTIN_RECURRENCE: &[(i64, u32)] = &[
    (1, 6),  // dental check-up
    (2, 24), // eye examination
    (3, 12), // skin check
    (4, 36), // cervical screening
    (5, 24), // breast screening
    (6, 12), // blood pressure check
    (7, 60), // cholesterol check
    (8, 12), // annual physical
];

/// Read-only lookup from a guide id to its recurrence period.
pub trait RecurrenceCatalog: Send + Sync {
    fn recurrence_months(&self, guide_id: i64) -> Result<u32, WellGuideError>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticRecurrenceCatalog {
    months: BTreeMap<i64, u32>,
}

impl StaticRecurrenceCatalog {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_RECURRENCE.iter().copied())
    }

    /// Entries with a zero period are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = (i64, u32)>) -> Self {
        let months = entries
            .into_iter()
            .filter(|(guide_id, months)| {
                if *months == 0 {
                    warn!("Ignoring zero recurrence period for guide {}", guide_id);
                }
                *months > 0
            })
            .collect();

        Self { months }
    }

    /// Built-in table extended by `WELL_GUIDE_RECURRENCE_MONTHS`.
    pub fn from_config(config: &AppConfig) -> Self {
        let catalog = Self::builtin();
        match config.well_guide_recurrence.as_deref() {
            Some(raw) => catalog.with_overrides(raw),
            None => catalog,
        }
    }

    /// Applies `"<guideId>:<months>,..."` on top of the current table.
    pub fn with_overrides(mut self, raw: &str) -> Self {
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match parse_override(entry) {
                Some((guide_id, months)) => {
                    debug!("Recurrence override: guide {} every {} months", guide_id, months);
                    self.months.insert(guide_id, months);
                }
                None => warn!("Skipping malformed recurrence override '{}'", entry),
            }
        }
        self
    }

    pub fn guide_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.months.keys().copied()
    }
}

impl RecurrenceCatalog for StaticRecurrenceCatalog {
    fn recurrence_months(&self, guide_id: i64) -> Result<u32, WellGuideError> {
        self.months
            .get(&guide_id)
            .copied()
            .ok_or(WellGuideError::UnknownGuide(guide_id))
    }
}

fn parse_override(entry: &str) -> Option<(i64, u32)> {
    let (guide_id, months) = entry.split_once(':')?;
    let guide_id = guide_id.trim().parse::<i64>().ok().filter(|id| *id > 0)?;
    let months = months.trim().parse::<u32>().ok().filter(|m| *m > 0)?;
    Some((guide_id, months))
}
