use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::{BatchEntry, Client, OrderCandidate};

/// Document-store collaborator: order/client reads plus an append-to-batch-list write.
pub trait OrderStore {
    fn load_orders(&self) -> Result<Vec<OrderCandidate>, StoreError>;

    fn load_clients(&self) -> Result<Vec<Client>, StoreError>;

    /// Append one entry to the batch list of the order at `order_path`.
    fn append_batch(&mut self, order_path: &str, entry: &BatchEntry) -> Result<(), StoreError>;
}

/// In-memory store. Useful for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub orders: Vec<OrderCandidate>,
    pub clients: Vec<Client>,
    pub appended: HashMap<String, Vec<BatchEntry>>,
    /// 1-based write attempt number that is rejected, if any.
    pub fail_on_write: Option<usize>,
    pub write_attempts: usize,
}

impl MemoryStore {
    pub fn new(orders: Vec<OrderCandidate>, clients: Vec<Client>) -> Self {
        Self {
            orders,
            clients,
            ..Default::default()
        }
    }

    pub fn appended_count(&self) -> usize {
        self.appended.values().map(Vec::len).sum()
    }
}

impl OrderStore for MemoryStore {
    fn load_orders(&self) -> Result<Vec<OrderCandidate>, StoreError> {
        Ok(self.orders.clone())
    }

    fn load_clients(&self) -> Result<Vec<Client>, StoreError> {
        Ok(self.clients.clone())
    }

    fn append_batch(&mut self, order_path: &str, entry: &BatchEntry) -> Result<(), StoreError> {
        self.write_attempts += 1;
        if self.fail_on_write == Some(self.write_attempts) {
            return Err(StoreError::Rejected(format!(
                "write {} to {order_path} rejected",
                self.write_attempts
            )));
        }
        if !self.orders.iter().any(|o| o.path == order_path) {
            return Err(StoreError::NotFound(order_path.to_string()));
        }
        self.appended
            .entry(order_path.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }
}
