use hickory_proto::op::Message;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Last successful response per hostname.
///
/// Entries never expire; a newer response for the same hostname replaces
/// the old one. Lookups that get no response at all fall back to whatever
/// is stored here.
#[derive(Debug, Default)]
pub struct Cache {
    last: RwLock<HashMap<String, Arc<Message>>>,
}

impl Cache {
    /// Records `response` for `hostname` if there is one, otherwise returns
    /// the last response recorded for `hostname`.
    pub fn store_or_fallback(
        &self,
        hostname: &str,
        response: Option<Arc<Message>>,
    ) -> Option<Arc<Message>> {
        match response {
            Some(response) => {
                self.last
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(hostname.to_string(), response.clone());
                Some(response)
            }
            None => self.get(hostname),
        }
    }

    /// Gets the last response recorded for `hostname`.
    pub fn get(&self, hostname: &str) -> Option<Arc<Message>> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hostname)
            .cloned()
    }

    /// Number of hostnames with a recorded response.
    pub fn len(&self) -> usize {
        self.last.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: u16) -> Arc<Message> {
        let mut message = Message::new();
        message.set_id(id);
        Arc::new(message)
    }

    #[test]
    fn stores_and_falls_back() {
        let cache = Cache::default();
        assert!(cache.store_or_fallback("a", None).is_none());

        let first = cache.store_or_fallback("a", Some(response(1))).unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(cache.store_or_fallback("a", None).unwrap().id(), 1);
        assert!(cache.store_or_fallback("b", None).is_none());
    }

    #[test]
    fn newer_response_replaces_older() {
        let cache = Cache::default();
        cache.store_or_fallback("a", Some(response(1)));
        cache.store_or_fallback("a", Some(response(2)));
        assert_eq!(cache.get("a").unwrap().id(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(Cache::default());
        let handles = (0..8u16)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let host = format!("host{}", i % 2);
                    for _ in 0..100 {
                        cache.store_or_fallback(&host, Some(response(i)));
                        assert!(cache.store_or_fallback(&host, None).is_some());
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
