use crate::error::StoreError;
use crate::model::{Client, OrderCandidate};
use crate::search::SearchIndex;
use crate::store::OrderStore;

/// Read-through cache of orders and clients used by matching and manual search.
///
/// The first access loads from the store; later accesses reuse the snapshot
/// until [`OrderCache::refresh`] is called.
#[derive(Debug, Default)]
pub struct OrderCache {
    snapshot: Option<Snapshot>,
}

#[derive(Debug)]
struct Snapshot {
    orders: Vec<OrderCandidate>,
    clients: Vec<Client>,
    index: SearchIndex,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled with a fixed candidate set. No store is consulted.
    pub fn with_data(orders: Vec<OrderCandidate>, clients: Vec<Client>) -> Self {
        let index = SearchIndex::build(&orders);
        Self {
            snapshot: Some(Snapshot { orders, clients, index }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn ensure_loaded(&mut self, store: &dyn OrderStore) -> Result<(), StoreError> {
        if self.snapshot.is_none() {
            self.refresh(store)?;
        }
        Ok(())
    }

    /// Reload orders and clients from the store, rebuilding the search index.
    pub fn refresh(&mut self, store: &dyn OrderStore) -> Result<(), StoreError> {
        let orders = store.load_orders()?;
        let clients = store.load_clients()?;
        tracing::debug!(orders = orders.len(), clients = clients.len(), "order cache refreshed");
        let index = SearchIndex::build(&orders);
        self.snapshot = Some(Snapshot { orders, clients, index });
        Ok(())
    }

    pub fn orders(&self) -> &[OrderCandidate] {
        self.snapshot.as_ref().map(|s| s.orders.as_slice()).unwrap_or(&[])
    }

    pub fn clients(&self) -> &[Client] {
        self.snapshot.as_ref().map(|s| s.clients.as_slice()).unwrap_or(&[])
    }

    pub fn index(&self) -> Option<&SearchIndex> {
        self.snapshot.as_ref().map(|s| &s.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn order(id: &str) -> OrderCandidate {
        OrderCandidate {
            id: id.into(),
            path: format!("customers/c1/orders/{id}"),
            customer_id: "c1".into(),
            reference: None,
            fabric: "Jersey".into(),
            quantity: 10.0,
            batches: vec![],
        }
    }

    #[test]
    fn loads_once_until_refreshed() {
        let mut store = MemoryStore::new(vec![order("o1")], vec![]);
        let mut cache = OrderCache::new();
        assert!(!cache.is_loaded());
        assert!(cache.orders().is_empty());

        cache.ensure_loaded(&store).unwrap();
        assert_eq!(cache.orders().len(), 1);

        store.orders.push(order("o2"));
        cache.ensure_loaded(&store).unwrap();
        assert_eq!(cache.orders().len(), 1, "stale snapshot until refresh");

        cache.refresh(&store).unwrap();
        assert_eq!(cache.orders().len(), 2);
        assert_eq!(cache.index().unwrap().len(), 2);
    }
}
