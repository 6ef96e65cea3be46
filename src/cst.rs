//! Content Store / registered-prefix table (C3, §4.3): append-only list of
//! locally-served name prefixes, looked up by **first**-match (not
//! longest-match) to preserve the historical source's observable dispatch
//! order (§8 property 3).

use crate::name::{first_match, Name};

pub struct CstEntry<S> {
    pub prefix: Name,
    pub sink: S,
    pub flags: u32,
}

pub struct Cst<S> {
    entries: Vec<CstEntry<S>>,
}

impl<S> Default for Cst<S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<S> Cst<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration. The CST never removes entries except on
    /// Face close (`clear`) — registration is a lifetime-of-the-Face
    /// commitment (§4.3).
    pub fn register(&mut self, prefix: Name, sink: S, flags: u32) {
        self.entries.push(CstEntry { prefix, sink, flags });
    }

    /// First-registered entry whose prefix is a prefix of `name`.
    pub fn lookup(&self, name: &Name) -> Option<&CstEntry<S>> {
        first_match(&self.entries, name, |e| &e.prefix)
    }

    /// Swaps the sink of the first-match entry for `name` with
    /// `placeholder`, returning the entry's index and its real sink. The
    /// index identifies the entry for a later [`Cst::restore_sink`] call —
    /// entries are append-only, so an index taken here stays valid even if
    /// the swapped-out sink re-enters and registers new prefixes meanwhile
    /// (they can only append past it).
    pub fn swap_sink(&mut self, name: &Name, placeholder: S) -> Option<(usize, S)> {
        let idx = self.entries.iter().position(|e| e.prefix.is_prefix_of(name))?;
        let old = std::mem::replace(&mut self.entries[idx].sink, placeholder);
        Some((idx, old))
    }

    /// Restores a sink previously taken out by [`Cst::swap_sink`].
    pub fn restore_sink(&mut self, idx: usize, sink: S) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.sink = sink;
        }
    }

    pub fn is_registered(&self, prefix: &Name) -> bool {
        self.entries.iter().any(|e| &e.prefix == prefix)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) -> Vec<S> {
        self.entries.drain(..).map(|e| e.sink).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins_over_longer_later_prefix() {
        let mut cst: Cst<&'static str> = Cst::new();
        cst.register(Name::from_uri("/a"), "shallow", 0);
        cst.register(Name::from_uri("/a/b"), "deep", 0);

        let found = cst.lookup(&Name::from_uri("/a/b/c")).unwrap();
        assert_eq!(found.sink, "shallow");
    }

    #[test]
    fn test_lookup_none_when_no_prefix_matches() {
        let mut cst: Cst<&'static str> = Cst::new();
        cst.register(Name::from_uri("/app/foo"), "handler", 0);
        assert!(cst.lookup(&Name::from_uri("/other")).is_none());
    }

    #[test]
    fn test_clear_empties_table() {
        let mut cst: Cst<&'static str> = Cst::new();
        cst.register(Name::from_uri("/a"), "x", 0);
        let sinks = cst.clear();
        assert_eq!(sinks, vec!["x"]);
        assert_eq!(cst.len(), 0);
    }
}
