// SQLite-backed order store

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use dyetrack_recon::model::{BatchEntry, BatchEvent, BatchEventKind, BatchRef, Client, ColorBatch, OrderCandidate};
use dyetrack_recon::store::OrderStore;
use dyetrack_recon::StoreError;

use crate::IoError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,       -- customers/{customer}/orders/{id}
    customer_id TEXT NOT NULL,
    reference TEXT,
    fabric TEXT NOT NULL,
    quantity REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS color_batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_path TEXT NOT NULL REFERENCES orders(path) ON UPDATE CASCADE,
    color TEXT NOT NULL,
    dyehouse TEXT,
    dispatch_number TEXT,
    status TEXT,
    payload TEXT,                    -- JSON BatchEntry; NULL for planned batches
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS batch_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id INTEGER NOT NULL REFERENCES color_batches(id),
    kind TEXT NOT NULL,              -- delivery | return
    quantity REAL NOT NULL,
    date TEXT NOT NULL
);
"#;

/// Seed file for `orders load`: clients plus orders with their planned colors.
#[derive(Debug, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub orders: Vec<SeedOrder>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOrder {
    pub id: String,
    pub customer_id: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub fabric: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub batches: Vec<BatchRef>,
}

pub fn order_path(customer_id: &str, order_id: &str) -> String {
    format!("customers/{customer_id}/orders/{order_id}")
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        // Moving an order to another customer rewrites its path; batches follow it
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        let version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
            .optional()?;
        match version {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![crate::STORE_SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(v) => {
                let found: u32 = v.parse().unwrap_or(0);
                if found != crate::STORE_SCHEMA_VERSION {
                    return Err(IoError::SchemaVersion {
                        found,
                        expected: crate::STORE_SCHEMA_VERSION,
                    });
                }
            }
        }

        Ok(Self { conn })
    }

    pub fn upsert_client(&self, client: &Client) -> Result<(), IoError> {
        self.conn.execute(
            "INSERT INTO customers (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![client.id, client.name],
        )?;
        Ok(())
    }

    /// Insert or update an order. Planned batches are added only for colors
    /// the order does not carry yet.
    pub fn upsert_order(&self, order: &SeedOrder) -> Result<String, IoError> {
        let path = order_path(&order.customer_id, &order.id);
        self.conn.execute(
            "INSERT INTO orders (id, path, customer_id, reference, fabric, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 path = excluded.path,
                 customer_id = excluded.customer_id,
                 reference = excluded.reference,
                 fabric = excluded.fabric,
                 quantity = excluded.quantity",
            params![order.id, path, order.customer_id, order.reference, order.fabric, order.quantity],
        )?;

        for batch in &order.batches {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM color_batches WHERE order_path = ?1 AND lower(trim(color)) = lower(trim(?2)))",
                params![path, batch.color],
                |row| row.get(0),
            )?;
            if !exists {
                self.conn.execute(
                    "INSERT INTO color_batches (order_path, color, dyehouse, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![path, batch.color, batch.dyehouse, now()],
                )?;
            }
        }
        Ok(path)
    }

    /// Load a JSON seed. Returns (clients, orders) written.
    pub fn load_seed(&mut self, json: &str) -> Result<(usize, usize), IoError> {
        let seed: Seed = serde_json::from_str(json)?;
        let tx = self.conn.unchecked_transaction()?;
        for client in &seed.clients {
            self.upsert_client(client)?;
        }
        for order in &seed.orders {
            self.upsert_order(order)?;
        }
        tx.commit()?;
        tracing::info!(clients = seed.clients.len(), orders = seed.orders.len(), "seed loaded");
        Ok((seed.clients.len(), seed.orders.len()))
    }

    fn order_exists(&self, order_path: &str) -> Result<bool, IoError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE path = ?1)",
            params![order_path],
            |row| row.get(0),
        )?)
    }

    /// Insert a committed batch entry under an order. Returns the batch id.
    pub fn insert_batch(&self, order_path: &str, entry: &BatchEntry) -> Result<i64, IoError> {
        if !self.order_exists(order_path)? {
            return Err(IoError::OrderNotFound(order_path.to_string()));
        }
        let payload = serde_json::to_string(entry)?;
        self.conn.execute(
            "INSERT INTO color_batches (order_path, color, dyehouse, dispatch_number, status, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order_path,
                entry.color,
                entry.dyehouse,
                entry.dispatch_number,
                entry.status.to_string(),
                payload,
                now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Committed batches of an order, oldest first, with their events.
    /// Planned batches (seeded colors without a dispatch) are not included.
    pub fn batches(&self, order_path: &str) -> Result<Vec<ColorBatch>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload FROM color_batches
             WHERE order_path = ?1 AND payload IS NOT NULL
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![order_path], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut batches = Vec::with_capacity(rows.len());
        for (id, payload) in rows {
            let entry: BatchEntry = serde_json::from_str(&payload)?;
            batches.push(ColorBatch {
                id,
                order_path: order_path.to_string(),
                entry,
                events: self.events(id)?,
            });
        }
        Ok(batches)
    }

    /// Append a delivery or return event to a batch. Events are never edited.
    pub fn append_event(&self, batch_id: i64, event: &BatchEvent) -> Result<i64, IoError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM color_batches WHERE id = ?1)",
            params![batch_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(IoError::BatchNotFound(batch_id));
        }
        self.conn.execute(
            "INSERT INTO batch_events (batch_id, kind, quantity, date) VALUES (?1, ?2, ?3, ?4)",
            params![batch_id, event.kind.to_string(), event.quantity, event.date],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn events(&self, batch_id: i64) -> Result<Vec<BatchEvent>, IoError> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, quantity, date FROM batch_events WHERE batch_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![batch_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, quantity, date)| {
                let kind: BatchEventKind = kind
                    .parse()
                    .map_err(|message| IoError::CorruptEvent { batch_id, message })?;
                Ok(BatchEvent { kind, quantity, date })
            })
            .collect()
    }

    fn orders(&self) -> Result<Vec<OrderCandidate>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, customer_id, reference, fabric, quantity FROM orders ORDER BY rowid",
        )?;
        let mut orders = stmt
            .query_map([], |row| {
                Ok(OrderCandidate {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    customer_id: row.get(2)?,
                    reference: row.get(3)?,
                    fabric: row.get(4)?,
                    quantity: row.get(5)?,
                    batches: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT color, dyehouse FROM color_batches WHERE order_path = ?1 ORDER BY id")?;
        for order in &mut orders {
            order.batches = stmt
                .query_map(params![order.path], |row| {
                    Ok(BatchRef {
                        color: row.get(0)?,
                        dyehouse: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(orders)
    }

    fn clients(&self) -> Result<Vec<Client>, IoError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM customers ORDER BY rowid")?;
        let clients = stmt
            .query_map([], |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clients)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl OrderStore for SqliteStore {
    fn load_orders(&self) -> Result<Vec<OrderCandidate>, StoreError> {
        Ok(self.orders()?)
    }

    fn load_clients(&self) -> Result<Vec<Client>, StoreError> {
        Ok(self.clients()?)
    }

    fn append_batch(&mut self, order_path: &str, entry: &BatchEntry) -> Result<(), StoreError> {
        let id = self.insert_batch(order_path, entry)?;
        tracing::debug!(batch = id, path = order_path, "batch stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyetrack_recon::model::BatchStatus;

    const SEED: &str = r#"{
        "clients": [
            {"id": "c1", "name": "Acme Textiles"},
            {"id": "c2", "name": "Globex"}
        ],
        "orders": [
            {"id": "o1", "customer_id": "c1", "reference": "ORD-1", "fabric": "Cotton Jersey",
             "quantity": 500, "batches": [{"color": "Red", "dyehouse": "North"}, {"color": "Navy"}]},
            {"id": "o2", "customer_id": "c2", "fabric": "Fleece", "quantity": 80}
        ]
    }"#;

    fn entry(dispatch: &str) -> BatchEntry {
        BatchEntry {
            color: "Red".into(),
            planned_quantity: 50.0,
            quantity_sent: 50.0,
            quantity_received: 0.0,
            remaining: 50.0,
            scrap_percentage: String::new(),
            dyehouse: "North".into(),
            machine: Some("M1".into()),
            date_sent: "2025-01-01".into(),
            formation_date: String::new(),
            dispatch_number: dispatch.into(),
            status: BatchStatus::Sent,
        }
    }

    #[test]
    fn seed_roundtrip_to_candidates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load_seed(SEED).unwrap(), (2, 2));

        let orders = store.load_orders().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].path, "customers/c1/orders/o1");
        assert_eq!(orders[0].reference.as_deref(), Some("ORD-1"));
        assert_eq!(orders[0].batches.len(), 2);
        assert_eq!(orders[0].batches[0].dyehouse.as_deref(), Some("North"));
        assert_eq!(orders[1].reference, None);
        assert!(orders[1].batches.is_empty());

        let clients = store.load_clients().unwrap();
        assert_eq!(clients[1].name, "Globex");
    }

    #[test]
    fn reseeding_does_not_duplicate_planned_colors() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.load_seed(SEED).unwrap();
        store.load_seed(SEED).unwrap();
        assert_eq!(store.load_orders().unwrap()[0].batches.len(), 2);
    }

    #[test]
    fn append_batch_and_events() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.load_seed(SEED).unwrap();

        store.append_batch("customers/c1/orders/o1", &entry("D-1")).unwrap();
        let batches = store.batches("customers/c1/orders/o1").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].entry, entry("D-1"));

        let id = batches[0].id;
        store
            .append_event(id, &BatchEvent { kind: BatchEventKind::Delivery, quantity: 30.0, date: "2025-01-05".into() })
            .unwrap();
        store
            .append_event(id, &BatchEvent { kind: BatchEventKind::Return, quantity: 2.0, date: "2025-01-07".into() })
            .unwrap();

        let batches = store.batches("customers/c1/orders/o1").unwrap();
        assert_eq!(batches[0].events.len(), 2);
        assert_eq!(batches[0].events[1].kind, BatchEventKind::Return);

        // committed colors become visible to the matcher as batches
        assert_eq!(store.load_orders().unwrap()[0].batches.len(), 3);
    }

    #[test]
    fn append_to_unknown_order_is_not_found() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.append_batch("customers/c9/orders/zz", &entry("D-1")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn event_on_unknown_batch_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let event = BatchEvent { kind: BatchEventKind::Delivery, quantity: 1.0, date: "2025-01-01".into() };
        assert!(matches!(store.append_event(42, &event), Err(IoError::BatchNotFound(42))));
    }

    #[test]
    fn reseed_moves_order_with_its_batches() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.load_seed(SEED).unwrap();
        store.append_batch("customers/c1/orders/o1", &entry("D-1")).unwrap();

        let moved = SEED.replace(r#""id": "o1", "customer_id": "c1""#, r#""id": "o1", "customer_id": "c2""#);
        assert_ne!(moved, SEED);
        assert_eq!(store.load_seed(&moved).unwrap(), (2, 2));

        let orders = store.load_orders().unwrap();
        let o1 = orders.iter().find(|o| o.id == "o1").unwrap();
        assert_eq!(o1.path, "customers/c2/orders/o1");
        assert_eq!(o1.customer_id, "c2");
        // two planned colors plus the committed one, no duplicates
        assert_eq!(o1.batches.len(), 3);

        assert!(store.batches("customers/c1/orders/o1").unwrap().is_empty());
        let batches = store.batches("customers/c2/orders/o1").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].order_path, "customers/c2/orders/o1");
        assert_eq!(batches[0].entry.dispatch_number, "D-1");
    }

    #[test]
    fn unreadable_event_kind_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.load_seed(SEED).unwrap();
        store.append_batch("customers/c1/orders/o1", &entry("D-1")).unwrap();
        let id = store.batches("customers/c1/orders/o1").unwrap()[0].id;
        store
            .conn
            .execute(
                "INSERT INTO batch_events (batch_id, kind, quantity, date) VALUES (?1, 'lost', 1.0, '2025-01-09')",
                params![id],
            )
            .unwrap();

        let err = store.batches("customers/c1/orders/o1").unwrap_err();
        assert!(matches!(err, IoError::CorruptEvent { batch_id, .. } if batch_id == id));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.load_seed(SEED).unwrap();
            store.append_batch("customers/c2/orders/o2", &entry("D-7")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.batches("customers/c2/orders/o2").unwrap()[0].entry.dispatch_number, "D-7");
    }

    #[test]
    fn rejects_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            conn.execute("INSERT INTO meta (key, value) VALUES ('schema_version', '99')", [])
                .unwrap();
        }
        let err = SqliteStore::open(&path).err().unwrap();
        assert!(matches!(err, IoError::SchemaVersion { found: 99, .. }));
    }
}
