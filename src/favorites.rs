use crate::models::EventId;

/// Storage key shared with the original browser build.
pub const FAVORITES_KEY: &str = "eventFavorites";

/// Minimal string key-value contract the favorites need from persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }
}

/// Favorited ids in the order they were added. Ids may refer to events that
/// are no longer approved; those are simply never matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: Vec<EventId>,
}

impl FavoriteSet {
    pub fn from_ids<I: IntoIterator<Item = EventId>>(ids: I) -> Self {
        let mut set = Self::default();
        for id in ids {
            if !set.contains(id) {
                set.ids.push(id);
            }
        }
        set
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[EventId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true when the id is a favorite after the call.
    pub fn toggle(&mut self, id: EventId) -> bool {
        if let Some(pos) = self.ids.iter().position(|existing| *existing == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        let ids: Vec<EventId> = serde_json::from_str(payload)?;
        Ok(Self::from_ids(ids))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.ids)
    }
}

/// Favorite set bound to its backing store. Every toggle rewrites the whole
/// stored list.
pub struct Favorites<S: KeyValueStore> {
    store: S,
    set: FavoriteSet,
}

impl<S: KeyValueStore> Favorites<S> {
    /// Missing, unreadable or corrupt payloads start from an empty set.
    pub fn load(store: S) -> Self {
        let set = match store.get(FAVORITES_KEY) {
            Ok(Some(payload)) => FavoriteSet::parse(&payload).unwrap_or_else(|err| {
                tracing::warn!("discarding corrupt favorites payload: {err}");
                FavoriteSet::default()
            }),
            Ok(None) => FavoriteSet::default(),
            Err(err) => {
                tracing::warn!("favorites unavailable, starting empty: {err:#}");
                FavoriteSet::default()
            }
        };
        Self { store, set }
    }

    pub fn set(&self) -> &FavoriteSet {
        &self.set
    }

    pub fn is_favorite(&self, id: EventId) -> bool {
        self.set.contains(id)
    }

    /// Flips membership of `id` and persists the full set. A failed write is
    /// logged; the in-memory set still reflects the toggle and the stored
    /// payload is left as it was.
    pub fn toggle(&mut self, id: EventId) -> bool {
        let now_favorite = self.set.toggle(id);
        let written = self
            .set
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|payload| self.store.set(FAVORITES_KEY, &payload));
        if let Err(err) = written {
            tracing::warn!(event_id = id, "failed to persist favorites: {err:#}");
        }
        tracing::debug!(event_id = id, now_favorite, "favorite toggled");
        now_favorite
    }
}
