use crate::model::{Client, DispatchRecord, MatchResult, OrderCandidate, Resolution};

/// Lowercase with all whitespace removed.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn same_color(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Bidirectional substring containment on normalized fabric text.
/// Empty text on either side never qualifies.
pub fn fabric_related(record_fabric: &str, order_fabric: &str) -> bool {
    let a = normalize(record_fabric);
    let b = normalize(order_fabric);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Find the order a dispatch record belongs to.
///
/// Stage one keeps candidates whose fabric is related to the record's fabric;
/// stage two picks the first of those holding a batch with the record's color.
/// Candidate order decides ties: the first qualifying candidate wins.
pub fn match_record<'a>(
    record: &DispatchRecord,
    candidates: &'a [OrderCandidate],
) -> Option<&'a OrderCandidate> {
    candidates
        .iter()
        .filter(|order| fabric_related(&record.fabric, &order.fabric))
        .find(|order| order.batches.iter().any(|b| same_color(&b.color, &record.color)))
}

/// Map the record's client text to a customer id.
/// Exact normalized name first, then containment either way.
pub fn resolve_client(record: &DispatchRecord, clients: &[Client]) -> Option<String> {
    let wanted = normalize(&record.client);
    if wanted.is_empty() {
        return None;
    }

    let exact = clients.iter().find(|c| normalize(&c.name) == wanted);
    let client = exact.or_else(|| {
        clients.iter().find(|c| {
            let name = normalize(&c.name);
            !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
        })
    })?;
    Some(client.id.clone())
}

/// Run the automatic pass over a freshly loaded set of results.
///
/// Only `Pending` rows are evaluated; manual picks and earlier outcomes are
/// returned untouched.
pub fn apply_automatic_match(
    results: Vec<MatchResult>,
    candidates: &[OrderCandidate],
    clients: &[Client],
) -> Vec<MatchResult> {
    results
        .into_iter()
        .map(|mut result| {
            if !result.resolution.is_pending() {
                return result;
            }
            if result.client_id.is_none() {
                result.client_id = resolve_client(&result.record, clients);
            }
            result.resolution = match match_record(&result.record, candidates) {
                Some(order) => Resolution::Matched {
                    order_id: order.id.clone(),
                    label: order.match_label(),
                },
                None => Resolution::New,
            };
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchRef, RecordId};

    fn record(fabric: &str, color: &str, client: &str) -> DispatchRecord {
        DispatchRecord {
            id: RecordId(2),
            dispatch_number: "D-1".into(),
            date_sent: String::new(),
            formation_date: String::new(),
            fabric: fabric.into(),
            color: color.into(),
            client: client.into(),
            quantity_sent: 100.0,
            quantity_received: 0.0,
            remaining: 0.0,
            scrap_percentage: String::new(),
            machine: None,
        }
    }

    fn order(id: &str, fabric: &str, colors: &[&str]) -> OrderCandidate {
        OrderCandidate {
            id: id.into(),
            path: format!("customers/c1/orders/{id}"),
            customer_id: "c1".into(),
            reference: None,
            fabric: fabric.into(),
            quantity: 0.0,
            batches: colors
                .iter()
                .map(|c| BatchRef { color: (*c).into(), dyehouse: None })
                .collect(),
        }
    }

    #[test]
    fn normalize_strips_whitespace_and_case() {
        assert_eq!(normalize("  Cotton  Jersey\t30/1 "), "cottonjersey30/1");
    }

    #[test]
    fn fabric_containment_is_bidirectional() {
        assert!(fabric_related("Cotton Jersey 30/1", "cotton jersey"));
        assert!(fabric_related("jersey", "Cotton Jersey"));
        assert!(!fabric_related("Rib", "Cotton Jersey"));
        assert!(!fabric_related("", "Cotton Jersey"));
        assert!(!fabric_related("Rib", "   "));
    }

    #[test]
    fn fabric_and_color_must_both_match() {
        let candidates = vec![
            order("o1", "Rib", &["Red"]),
            order("o2", "Cotton Jersey", &["Navy", " RED "]),
        ];
        let hit = match_record(&record("cotton jersey", "red", ""), &candidates).unwrap();
        assert_eq!(hit.id, "o2");

        assert!(match_record(&record("cotton jersey", "green", ""), &candidates).is_none());
    }

    #[test]
    fn first_qualifying_candidate_wins() {
        let candidates = vec![
            order("o1", "Jersey", &["Red"]),
            order("o2", "Cotton Jersey", &["Red"]),
        ];
        let hit = match_record(&record("Cotton Jersey", "Red", ""), &candidates).unwrap();
        assert_eq!(hit.id, "o1");
    }

    #[test]
    fn color_is_exact_not_substring() {
        let candidates = vec![order("o1", "Jersey", &["Dark Red"])];
        assert!(match_record(&record("Jersey", "Red", ""), &candidates).is_none());
    }

    #[test]
    fn unrelated_fabric_is_new_regardless_of_color() {
        let candidates = vec![order("o1", "Jersey", &["Red"])];
        let results = vec![MatchResult::pending(record("Fleece", "Red", ""))];
        let out = apply_automatic_match(results, &candidates, &[]);
        assert_eq!(out[0].resolution, Resolution::New);
    }

    #[test]
    fn automatic_pass_sets_label() {
        let mut o = order("abcdef99", "Jersey", &["Red"]);
        o.reference = Some("ORD-12".into());
        let out = apply_automatic_match(
            vec![MatchResult::pending(record("Jersey", "Red", ""))],
            &[o],
            &[],
        );
        assert_eq!(
            out[0].resolution,
            Resolution::Matched { order_id: "abcdef99".into(), label: "ORD-12 - Jersey".into() }
        );
    }

    #[test]
    fn automatic_pass_skips_non_pending() {
        let candidates = vec![order("o1", "Jersey", &["Red"])];
        let mut manual = MatchResult::pending(record("Jersey", "Red", ""));
        manual.resolution = Resolution::Matched { order_id: "o9".into(), label: "O9 - Rib".into() };
        let mut new = MatchResult::pending(record("Jersey", "Red", ""));
        new.resolution = Resolution::New;

        let out = apply_automatic_match(vec![manual.clone(), new.clone()], &candidates, &[]);
        assert_eq!(out[0], manual);
        assert_eq!(out[1], new);
    }

    #[test]
    fn client_resolution_prefers_exact_name() {
        let clients = vec![
            Client { id: "c1".into(), name: "Acme Textiles Group".into() },
            Client { id: "c2".into(), name: "Acme Textiles".into() },
        ];
        assert_eq!(resolve_client(&record("", "", "ACME  textiles"), &clients).as_deref(), Some("c2"));
        assert_eq!(resolve_client(&record("", "", "Acme"), &clients).as_deref(), Some("c1"));
        assert_eq!(resolve_client(&record("", "", "Globex"), &clients), None);
        assert_eq!(resolve_client(&record("", "", " "), &clients), None);
    }

    #[test]
    fn client_is_not_a_hard_filter() {
        let mut o = order("o1", "Jersey", &["Red"]);
        o.customer_id = "c2".into();
        let clients = vec![Client { id: "c1".into(), name: "Acme".into() }];
        let out = apply_automatic_match(
            vec![MatchResult::pending(record("Jersey", "Red", "Acme"))],
            &[o],
            &clients,
        );
        assert_eq!(out[0].client_id.as_deref(), Some("c1"));
        assert_eq!(out[0].resolution.order_id(), Some("o1"));
    }
}
