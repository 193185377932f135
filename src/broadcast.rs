//! Page-wide language preference and its `languageChange` channel.

use std::sync::{Arc, Mutex, Weak};

use crate::prefs::PreferenceStore;

pub const PREFERENCE_KEY: &str = "book-language-preference";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Urdu,
}

impl Language {
    pub fn from_urdu(is_urdu: bool) -> Self {
        if is_urdu {
            Language::Urdu
        } else {
            Language::English
        }
    }

    pub fn is_urdu(self) -> bool {
        self == Language::Urdu
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Urdu => "urdu",
        }
    }

    /// Only the exact `urdu` tag selects Urdu.
    pub fn from_tag(tag: &str) -> Self {
        Language::from_urdu(tag == "urdu")
    }
}

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct Shared {
    is_urdu: bool,
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    store: Box<dyn PreferenceStore>,
}

/// Single writer for the language preference.
///
/// `set_preference` persists, then calls every listener registered at that
/// moment, in subscription order, before returning. Listeners run outside
/// the internal lock so they may read the preference or (un)subscribe.
#[derive(Clone)]
pub struct LanguageBroadcaster {
    shared: Arc<Mutex<Shared>>,
}

impl LanguageBroadcaster {
    /// Reads the persisted value; a missing or unreadable slot means English.
    pub fn open(store: Box<dyn PreferenceStore>) -> Self {
        let is_urdu = match store.load(PREFERENCE_KEY) {
            Ok(Some(tag)) => Language::from_tag(&tag).is_urdu(),
            Ok(None) => false,
            Err(e) => {
                log::warn!("language preference unreadable, defaulting to English: {:#}", e);
                false
            }
        };
        log::debug!("language preference loaded: urdu={}", is_urdu);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                is_urdu,
                next_id: 0,
                listeners: Vec::new(),
                store,
            })),
        }
    }

    pub fn get_preference(&self) -> bool {
        self.lock().is_urdu
    }

    pub fn language(&self) -> Language {
        Language::from_urdu(self.get_preference())
    }

    pub fn set_preference(&self, is_urdu: bool) {
        let listeners: Vec<Listener> = {
            let mut shared = self.lock();
            if let Err(e) = shared.store.save(PREFERENCE_KEY, Language::from_urdu(is_urdu).tag()) {
                log::warn!("failed to persist language preference: {:#}", e);
            }
            shared.is_urdu = is_urdu;
            shared.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        log::info!("language set to {}, notifying {} listeners", Language::from_urdu(is_urdu).tag(), listeners.len());
        for listener in listeners {
            listener(is_urdu);
        }
    }

    /// Flips the preference and returns the new value.
    pub fn toggle(&self) -> bool {
        let next = !self.get_preference();
        self.set_preference(next);
        next
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut shared = self.lock();
        let id = shared.next_id;
        shared.next_id += 1;
        shared.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes its listener when dropped.
pub struct Subscription {
    id: u64,
    shared: Weak<Mutex<Shared>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
            shared.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
