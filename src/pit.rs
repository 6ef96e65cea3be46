//! Pending Interest Table (C2, §4.2): outstanding Interests awaiting Data,
//! matched by longest-prefix name match with insertion-order tie-break.
//!
//! Grounded on the teacher's `tables.rs` entry/removal shape, but a plain
//! linear-scan `Vec` rather than a trie: the specification calls the PIT
//! an "unordered collection" sized to one Face's outstanding requests, not
//! a process-wide FIB shared across many faces.

use crate::codec::Interest;
use crate::name::{longest_match, Name};
use crate::timestamp::Timestamp;

/// What a PIT entry's sink is told, and what it may ask for in return.
pub enum DataOutcome {
    Content,
    ContentUnverified,
    ContentBad,
}

pub enum SinkAction {
    /// Stop; the entry has already been consumed.
    Done,
    /// Re-express the same Interest with a fresh timer (only meaningful as
    /// the return value of a timeout callback).
    Reexpress,
}

/// A unique, monotonically increasing identity for a PIT entry, stable
/// across re-insertion on `Reexpress` so callers can still refer to "the
/// same logical request" (tests rely on this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitId(u64);

struct Entry<S> {
    id: PitId,
    interest: Interest,
    sink: S,
    expires_at: Timestamp,
}

/// `S` is the sink type a Face stores per pending Interest; it is generic
/// here so the table itself stays free of callback-closure machinery.
pub struct Pit<S> {
    entries: Vec<Entry<S>>,
    next_id: u64,
}

impl<S> Default for Pit<S> {
    fn default() -> Self {
        Self { entries: Vec::new(), next_id: 0 }
    }
}

impl<S> Pit<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new entry with a fresh lifetime timer deadline computed
    /// from `now` and `interest.interest_lifetime_ms`. Returns the new
    /// entry's id.
    pub fn insert(&mut self, interest: Interest, sink: S, now: Timestamp) -> PitId {
        let id = PitId(self.next_id);
        self.next_id += 1;
        let expires_at = now.adding(interest.interest_lifetime_ms as u64);
        self.entries.push(Entry { id, interest, sink, expires_at });
        id
    }

    /// Longest-match lookup for an incoming Data's name (§4.2, §4.1): the
    /// entry whose Interest name is a prefix of `name` with the most
    /// components, ties broken by earliest insertion. Removes and returns
    /// the matched entry; a matching timer fire racing this call observes
    /// the entry already gone and is a no-op by construction (§5).
    pub fn take_matching(&mut self, name: &Name) -> Option<(Interest, S)> {
        let index = longest_match_index(&self.entries, name)?;
        let entry = self.entries.remove(index);
        Some((entry.interest, entry.sink))
    }

    /// Removes by id. Idempotent: already-removed ids are a no-op.
    pub fn remove(&mut self, id: PitId) -> Option<S> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index).sink)
    }

    /// Drains every entry whose `expires_at` is at or before `now`, in
    /// insertion order, for the caller to invoke with `TimedOut`.
    pub fn take_expired(&mut self, now: Timestamp) -> Vec<(PitId, Interest, S)> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].expires_at <= now {
                let entry = self.entries.remove(i);
                expired.push((entry.id, entry.interest, entry.sink));
            } else {
                i += 1;
            }
        }
        expired
    }

    /// The nearest upcoming expiry, used by the event loop to size its poll
    /// timeout (§5.1).
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.entries.iter().map(|e| e.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry (Face close, §4.7.3); returns their sinks so the
    /// caller can decide whether to notify them (the spec requires no
    /// further sink invocation after close, so callers typically drop
    /// these).
    pub fn clear(&mut self) -> Vec<S> {
        self.entries.drain(..).map(|e| e.sink).collect()
    }
}

fn longest_match_index<S>(entries: &[Entry<S>], target: &Name) -> Option<usize> {
    let candidate = longest_match(entries, target, |e| &e.interest.name)?;
    entries.iter().position(|e| std::ptr::eq(e, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> Timestamp {
        Timestamp { ms_since_1970: ms }
    }

    #[test]
    fn test_insert_and_take_matching_longest_prefix() {
        let mut pit: Pit<&'static str> = Pit::new();
        pit.insert(Interest::new(Name::from_uri("/a")), "short", ts(0));
        pit.insert(Interest::new(Name::from_uri("/a/b")), "long", ts(0));

        let (_, sink) = pit.take_matching(&Name::from_uri("/a/b/c")).unwrap();
        assert_eq!(sink, "long");
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_tie_break_by_insertion_order() {
        let mut pit: Pit<&'static str> = Pit::new();
        pit.insert(Interest::new(Name::from_uri("/a/b")), "first", ts(0));
        pit.insert(Interest::new(Name::from_uri("/a/b")), "second", ts(0));

        let (_, sink) = pit.take_matching(&Name::from_uri("/a/b/c")).unwrap();
        assert_eq!(sink, "first");
    }

    #[test]
    fn test_take_expired_removes_only_due_entries() {
        let mut pit: Pit<&'static str> = Pit::new();
        let mut i1 = Interest::new(Name::from_uri("/a"));
        i1.interest_lifetime_ms = 100;
        let mut i2 = Interest::new(Name::from_uri("/b"));
        i2.interest_lifetime_ms = 10_000;
        pit.insert(i1, "soon", ts(0));
        pit.insert(i2, "later", ts(0));

        let expired = pit.take_expired(ts(100));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].2, "soon");
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut pit: Pit<&'static str> = Pit::new();
        let id = pit.insert(Interest::new(Name::from_uri("/a")), "x", ts(0));
        assert!(pit.remove(id).is_some());
        assert!(pit.remove(id).is_none());
    }

    #[test]
    fn test_clear_empties_table() {
        let mut pit: Pit<&'static str> = Pit::new();
        pit.insert(Interest::new(Name::from_uri("/a")), "x", ts(0));
        pit.insert(Interest::new(Name::from_uri("/b")), "y", ts(0));
        let sinks = pit.clear();
        assert_eq!(sinks.len(), 2);
        assert!(pit.is_empty());
    }
}
