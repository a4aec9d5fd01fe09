use crate::model::{format_number, MatchResult, OrderCandidate, Resolution};

/// Label offered in the manual picker: `"{ref} - {fabric} ({quantity}kg)"`.
pub fn option_label(order: &OrderCandidate) -> String {
    format!(
        "{} - {} ({}kg)",
        order.display_ref(),
        order.fabric,
        format_number(order.quantity)
    )
}

#[derive(Debug, Clone)]
struct SearchOption {
    label: String,
    folded: String,
    order: OrderCandidate,
}

/// Precomputed option labels for manual overrides.
///
/// Labels are not guaranteed unique; resolution takes the first exact hit.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    options: Vec<SearchOption>,
}

impl SearchIndex {
    pub fn build(candidates: &[OrderCandidate]) -> Self {
        let options = candidates
            .iter()
            .map(|order| {
                let label = option_label(order);
                SearchOption {
                    folded: label.to_lowercase(),
                    label,
                    order: order.clone(),
                }
            })
            .collect();
        Self { options }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Labels in scope for a record: its client's orders, or everything when
    /// the client was not resolved.
    pub fn options_for(&self, client_id: Option<&str>) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| in_scope(o, client_id))
            .map(|o| o.label.as_str())
            .collect()
    }

    /// Case-insensitive substring filter over the scoped labels.
    pub fn filter(&self, client_id: Option<&str>, query: &str) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        self.options
            .iter()
            .filter(|o| in_scope(o, client_id))
            .filter(|o| query.is_empty() || o.folded.contains(&query))
            .map(|o| o.label.as_str())
            .collect()
    }

    pub fn resolve(&self, label: &str) -> Option<&OrderCandidate> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        self.options.iter().find(|o| o.label == label).map(|o| &o.order)
    }
}

fn in_scope(option: &SearchOption, client_id: Option<&str>) -> bool {
    client_id.map_or(true, |id| option.order.customer_id == id)
}

/// Apply a manual pick. A resolvable label forces `Matched`; anything else
/// (including an empty input) forces `New`.
pub fn select(result: &mut MatchResult, index: &SearchIndex, input: &str) {
    result.resolution = match index.resolve(input) {
        Some(order) => Resolution::Matched {
            order_id: order.id.clone(),
            label: order.match_label(),
        },
        None => Resolution::New,
    };
}
