//! Tabular read/write contract between the pipeline and its storage.
//!
//! The pipeline only needs to read the `profiles` table and write the three
//! output tables; how they are stored is up to the implementor.

use crate::core::ProfileTable;
use crate::error::Result;
use crate::export::{ExportTables, ProfileRepPeriod, RepPeriodData, RepPeriodMapping};

/// Source of input profiles and sink for output tables.
pub trait TableStore {
    /// Read the `profiles` table.
    fn read_profiles(&self) -> Result<ProfileTable>;

    /// Replace the `rep_periods_data` table.
    fn write_rep_periods_data(&mut self, rows: &[RepPeriodData]) -> Result<()>;

    /// Replace the `rep_periods_mapping` table.
    fn write_rep_periods_mapping(&mut self, rows: &[RepPeriodMapping]) -> Result<()>;

    /// Replace the `profiles_rep_periods` table.
    fn write_profiles_rep_periods(&mut self, rows: &[ProfileRepPeriod]) -> Result<()>;

    /// Write all three output tables.
    fn write_tables(&mut self, tables: &ExportTables) -> Result<()> {
        self.write_rep_periods_data(&tables.rep_periods_data)?;
        self.write_rep_periods_mapping(&tables.rep_periods_mapping)?;
        self.write_profiles_rep_periods(&tables.profiles_rep_periods)
    }
}

/// Store keeping every table in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub profiles: ProfileTable,
    pub outputs: ExportTables,
}

impl InMemoryStore {
    pub fn new(profiles: ProfileTable) -> Self {
        Self {
            profiles,
            outputs: ExportTables::default(),
        }
    }
}

impl TableStore for InMemoryStore {
    fn read_profiles(&self) -> Result<ProfileTable> {
        Ok(self.profiles.clone())
    }

    fn write_rep_periods_data(&mut self, rows: &[RepPeriodData]) -> Result<()> {
        self.outputs.rep_periods_data = rows.to_vec();
        Ok(())
    }

    fn write_rep_periods_mapping(&mut self, rows: &[RepPeriodMapping]) -> Result<()> {
        self.outputs.rep_periods_mapping = rows.to_vec();
        Ok(())
    }

    fn write_profiles_rep_periods(&mut self, rows: &[ProfileRepPeriod]) -> Result<()> {
        self.outputs.profiles_rep_periods = rows.to_vec();
        Ok(())
    }
}
