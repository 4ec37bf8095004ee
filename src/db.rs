use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::favorites::KeyValueStore;
use crate::models::{placeholder_image_url, Coords, Event, EventStatus};
use crate::taxonomy::Category;
use crate::utils;

/// Read-only supply of every known event, both statuses, in display order.
pub trait EventSource {
    fn fetch_events(&self) -> anyhow::Result<Vec<Event>>;
}

const SEEDED_KEY: &str = "storeSeededAt";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open_default(root: &Path) -> rusqlite::Result<Self> {
        Self::open(&utils::database_path(root))
    }

    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        store.seed_if_empty()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                position INTEGER NOT NULL,
                payload TEXT NOT NULL,
                saved_at_utc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Seeds a brand-new database once; an emptied table stays empty.
    fn seed_if_empty(&self) -> rusqlite::Result<()> {
        if self.get_value(SEEDED_KEY)?.is_some() {
            return Ok(());
        }
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        if count == 0 {
            tracing::info!("seeding empty event store with sample events");
            self.replace_events(&sample_events())?;
        }
        self.set_value(SEEDED_KEY, &Utc::now().to_rfc3339())
    }

    pub fn list_events(&self) -> rusqlite::Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM events ORDER BY position ASC")?;
        let rows = stmt.query_map([], |row| {
            let payload: String = row.get(0)?;
            serde_json::from_str::<Event>(&payload).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    payload.len(),
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Rewrites the event table so it matches `events`, order included.
    pub fn replace_events(&self, events: &[Event]) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM events", [])?;
        let now = Utc::now();
        {
            let mut insert = tx.prepare(
                "INSERT INTO events (id, status, position, payload, saved_at_utc)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, event) in events.iter().enumerate() {
                let payload = serde_json::to_string(event)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                insert.execute(params![
                    event.id,
                    event.status.as_str(),
                    position as i64,
                    payload,
                    now
                ])?;
            }
        }
        tx.commit()
    }

    pub fn get_value(&self, key: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
    }

    pub fn set_value(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl EventSource for Store {
    fn fetch_events(&self) -> anyhow::Result<Vec<Event>> {
        Ok(self.list_events()?)
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get_value(key)?)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        Ok(self.set_value(key, value)?)
    }
}

fn sample_events() -> Vec<Event> {
    vec![
        sample_event(
            1,
            "Festival Internacional de Santa Lucía",
            "Concerts, theater and street art along the Paseo Santa Lucía riverwalk.",
            "2025-10-04",
            "Paseo Santa Lucía",
            Coords {
                lat: 25.6705,
                lng: -100.3025,
            },
            Category::Culture,
            EventStatus::Approved,
        ),
        sample_event(
            2,
            "Carrera Nocturna Fundidora",
            "A 10K night run through the old steelworks park, open to all levels.",
            "2025-09-20",
            "Parque Fundidora",
            Coords {
                lat: 25.6789,
                lng: -100.2847,
            },
            Category::Sports,
            EventStatus::Approved,
        ),
        sample_event(
            3,
            "Domingo Familiar en el Museo",
            "Hands-on science workshops and free museum entry for families.",
            "2025-09-28",
            "Museo del Acero Horno3",
            Coords {
                lat: 25.6786,
                lng: -100.2856,
            },
            Category::Family,
            EventStatus::Approved,
        ),
        sample_event(
            4,
            "Startup Mixer San Pedro",
            "Founders, investors and engineers meet for lightning talks and drinks.",
            "2025-10-09",
            "San Pedro Garza García",
            Coords {
                lat: 25.6573,
                lng: -100.4022,
            },
            Category::Uncategorized,
            EventStatus::Pending,
        ),
        sample_event(
            5,
            "Yoga al Amanecer en Chipinque",
            "Sunrise yoga session with a view over the city.",
            "2025-10-12",
            "Parque Ecológico Chipinque",
            Coords {
                lat: 25.6190,
                lng: -100.3560,
            },
            Category::Uncategorized,
            EventStatus::Pending,
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn sample_event(
    id: i64,
    title: &str,
    description: &str,
    date: &str,
    location: &str,
    coords: Coords,
    category: Category,
    status: EventStatus,
) -> Event {
    Event {
        id,
        title: title.to_string(),
        description: description.to_string(),
        date: date.to_string(),
        location: location.to_string(),
        image_url: placeholder_image_url(id),
        category,
        coords,
        status,
    }
}
