use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Import settings: sheet layout, machine window, default dyehouse.
///
/// Every field has a default, so an empty TOML document is a valid config
/// describing the standard dyehouse dispatch sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Dyehouse stamped on committed batches when none is given on the command line.
    pub dyehouse: Option<String>,
    pub layout: ColumnLayout,
    pub machines: MachineWindow,
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Column-index-to-field mapping for the dispatch sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Row holding the machine labels above the capacity columns.
    pub header_row: usize,
    pub data_start_row: usize,
    pub dispatch_number: usize,
    pub date_sent: usize,
    pub formation_date: usize,
    pub client: usize,
    pub fabric: usize,
    pub color: usize,
    pub quantity_sent: usize,
    pub quantity_received: usize,
    pub remaining: usize,
    pub scrap_percentage: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            header_row: 1,
            data_start_row: 2,
            dispatch_number: 0,
            date_sent: 1,
            formation_date: 2,
            client: 3,
            fabric: 4,
            color: 5,
            quantity_sent: 6,
            quantity_received: 7,
            remaining: 8,
            scrap_percentage: 9,
        }
    }
}

impl ColumnLayout {
    /// (field name, column) pairs, in sheet order of the default layout.
    pub fn fields(&self) -> [(&'static str, usize); 10] {
        [
            ("dispatch_number", self.dispatch_number),
            ("date_sent", self.date_sent),
            ("formation_date", self.formation_date),
            ("client", self.client),
            ("fabric", self.fabric),
            ("color", self.color),
            ("quantity_sent", self.quantity_sent),
            ("quantity_received", self.quantity_received),
            ("remaining", self.remaining),
            ("scrap_percentage", self.scrap_percentage),
        ]
    }
}

// ---------------------------------------------------------------------------
// Machine window
// ---------------------------------------------------------------------------

/// Horizontal window of capacity columns scanned for the assigned machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineWindow {
    pub scan_start: usize,
    /// Cell values that mark the machine column, compared case-insensitively.
    pub markers: Vec<String>,
}

impl Default for MachineWindow {
    fn default() -> Self {
        Self {
            scan_start: 12,
            markers: vec!["1".into(), "x".into()],
        }
    }
}

impl MachineWindow {
    pub fn is_marker(&self, value: &str) -> bool {
        let value = value.trim();
        self.markers.iter().any(|m| m.trim().eq_ignore_ascii_case(value))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ImportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ImportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let layout = &self.layout;

        if layout.header_row >= layout.data_start_row {
            return Err(ReconError::LayoutValidation(format!(
                "header_row ({}) must come before data_start_row ({})",
                layout.header_row, layout.data_start_row
            )));
        }

        let fields = layout.fields();
        for (i, (name, col)) in fields.iter().enumerate() {
            if let Some((other, _)) = fields[..i].iter().find(|(_, c)| c == col) {
                return Err(ReconError::LayoutValidation(format!(
                    "'{name}' and '{other}' both map to column {col}"
                )));
            }
            if *col >= self.machines.scan_start {
                return Err(ReconError::LayoutValidation(format!(
                    "'{name}' (column {col}) overlaps the machine window starting at column {}",
                    self.machines.scan_start
                )));
            }
        }

        if self.machines.markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ReconError::LayoutValidation(
                "at least one machine marker is required".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
