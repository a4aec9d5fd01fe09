use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sheet input
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as handed over by the IO layer.
///
/// Dates arrive as serial numbers; error cells arrive as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Display form used for identifiers and labels.
    /// Whole numbers render without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Dispatch records
// ---------------------------------------------------------------------------

/// Zero-based sheet row index of a record. Unique within one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub usize);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parsed row of a dyehouse dispatch sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub id: RecordId,
    pub dispatch_number: String,
    pub date_sent: String,
    pub formation_date: String,
    pub fabric: String,
    pub color: String,
    pub client: String,
    pub quantity_sent: f64,
    pub quantity_received: f64,
    pub remaining: f64,
    pub scrap_percentage: String,
    pub machine: Option<String>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
}

/// A color batch already planned on an order, as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dyehouse: Option<String>,
}

/// An existing order a dispatch record might belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCandidate {
    pub id: String,
    /// Full document path, e.g. `customers/c1/orders/o1`.
    pub path: String,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub fabric: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub batches: Vec<BatchRef>,
}

impl OrderCandidate {
    /// Order reference if set, else the first six characters of the id, uppercased.
    pub fn display_ref(&self) -> String {
        match self.reference.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.id.chars().take(6).collect::<String>().to_uppercase(),
        }
    }

    /// Label shown for an automatic or manual match.
    pub fn match_label(&self) -> String {
        format!("{} - {}", self.display_ref(), self.fabric)
    }
}

// ---------------------------------------------------------------------------
// Match state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Pending,
    Matched { order_id: String, label: String },
    New,
}

impl Resolution {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Matched { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched { .. } => "matched",
            Self::New => "new",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { label, .. } => write!(f, "matched ({label})"),
            other => write!(f, "{}", other.status_name()),
        }
    }
}

/// A dispatch record paired with its (possibly pending) order resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub record: DispatchRecord,
    pub resolution: Resolution,
    /// Customer resolved from the record's client text. Scopes manual search only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl MatchResult {
    pub fn pending(record: DispatchRecord) -> Self {
        Self {
            record,
            resolution: Resolution::Pending,
            client_id: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.record.id
    }
}

// ---------------------------------------------------------------------------
// Commit payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Sent,
    Received,
}

impl BatchStatus {
    pub fn from_received(quantity_received: f64) -> Self {
        if quantity_received > 0.0 {
            Self::Received
        } else {
            Self::Sent
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Received => write!(f, "received"),
        }
    }
}

/// The entry appended to an order's batch list on commit.
/// Field names are the storage schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub color: String,
    pub planned_quantity: f64,
    pub quantity_sent: f64,
    pub quantity_received: f64,
    pub remaining: f64,
    pub scrap_percentage: String,
    pub dyehouse: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    pub date_sent: String,
    pub formation_date: String,
    pub dispatch_number: String,
    pub status: BatchStatus,
}

impl BatchEntry {
    pub fn from_record(record: &DispatchRecord, dyehouse: &str) -> Self {
        Self {
            color: record.color.trim().to_string(),
            planned_quantity: record.quantity_sent,
            quantity_sent: record.quantity_sent,
            quantity_received: record.quantity_received,
            remaining: record.remaining,
            scrap_percentage: record.scrap_percentage.clone(),
            dyehouse: dyehouse.to_string(),
            machine: record.machine.clone(),
            date_sent: record.date_sent.clone(),
            formation_date: record.formation_date.clone(),
            dispatch_number: record.dispatch_number.clone(),
            status: BatchStatus::from_received(record.quantity_received),
        }
    }
}

/// Delivery or return event on a stored color batch. Events are append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchEventKind {
    Delivery,
    Return,
}

impl fmt::Display for BatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Return => write!(f, "return"),
        }
    }
}

impl std::str::FromStr for BatchEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "return" => Ok(Self::Return),
            other => Err(format!("unknown batch event kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEvent {
    pub kind: BatchEventKind,
    pub quantity: f64,
    pub date: String,
}

/// A color batch as stored under its order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBatch {
    pub id: i64,
    pub order_path: String,
    #[serde(flatten)]
    pub entry: BatchEntry,
    pub events: Vec<BatchEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, reference: Option<&str>) -> OrderCandidate {
        OrderCandidate {
            id: id.into(),
            path: format!("customers/c1/orders/{id}"),
            customer_id: "c1".into(),
            reference: reference.map(Into::into),
            fabric: "Cotton Jersey".into(),
            quantity: 500.0,
            batches: vec![],
        }
    }

    #[test]
    fn display_ref_prefers_reference() {
        assert_eq!(order("abcdefgh", Some("ORD-7")).display_ref(), "ORD-7");
        assert_eq!(order("abcdefgh", None).display_ref(), "ABCDEF");
        assert_eq!(order("abcdefgh", Some("  ")).display_ref(), "ABCDEF");
        assert_eq!(order("ab", None).display_ref(), "AB");
    }

    #[test]
    fn match_label_joins_ref_and_fabric() {
        assert_eq!(order("o1", Some("ORD-7")).match_label(), "ORD-7 - Cotton Jersey");
    }

    #[test]
    fn cell_text_forms() {
        assert_eq!(Cell::Number(1234.0).as_text(), "1234");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
        assert!(Cell::text("   ").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn status_follows_received_quantity() {
        assert_eq!(BatchStatus::from_received(0.0), BatchStatus::Sent);
        assert_eq!(BatchStatus::from_received(12.5), BatchStatus::Received);
    }

    #[test]
    fn resolution_serializes_with_status_tag() {
        let json = serde_json::to_value(Resolution::Matched {
            order_id: "o1".into(),
            label: "ORD-7 - Cotton".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "matched");
        assert_eq!(json["order_id"], "o1");

        let json = serde_json::to_value(Resolution::New).unwrap();
        assert_eq!(json["status"], "new");
    }

    #[test]
    fn event_kind_parses() {
        assert_eq!("Delivery".parse::<BatchEventKind>().unwrap(), BatchEventKind::Delivery);
        assert!("lost".parse::<BatchEventKind>().is_err());
    }
}
