//! Paste collection state
//!
//! Two independent read caches over the store:
//! - `all`: every paste, without owners (the public view)
//! - `mine`: the signed-in session's pastes, with owners
//!
//! The same paste may sit in both; every mutation is reconciled into each
//! cache that holds it. The store stays authoritative.

use crate::models::{title_key, OwnedPaste, Paste};

/// Local view state for the paste collection
#[derive(Debug, Clone, Default)]
pub struct PasteCollection {
    all: Vec<Paste>,
    mine: Vec<OwnedPaste>,
    loading: bool,
}

impl PasteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public pastes, in fetch order
    pub fn all(&self) -> &[Paste] {
        &self.all
    }

    /// The session's own pastes, in fetch order
    pub fn mine(&self) -> &[OwnedPaste] {
        &self.mine
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Replace the public view wholesale
    pub fn replace_all(&mut self, pastes: Vec<Paste>) {
        self.all = pastes;
    }

    /// Replace the owner view wholesale
    pub fn replace_mine(&mut self, pastes: Vec<OwnedPaste>) {
        self.mine = pastes;
    }

    /// Forget the owner view, e.g. after the session ends
    pub fn clear_mine(&mut self) {
        self.mine.clear();
    }

    /// Whether a public paste already uses this title (case-insensitive)
    pub fn has_title(&self, title: &str) -> bool {
        let key = title_key(title);
        self.all.iter().any(|p| title_key(&p.title) == key)
    }

    /// Append a freshly created paste to both views
    pub fn append_created(&mut self, created: OwnedPaste) {
        self.all.push(created.paste.clone());
        self.mine.push(created);
    }

    /// Overwrite the matching entry (by id) in each view that holds it
    ///
    /// Returns the number of views updated.
    pub fn apply_update(&mut self, updated: &Paste) -> usize {
        let mut touched = 0;
        if let Some(entry) = self.all.iter_mut().find(|p| p.id == updated.id) {
            *entry = updated.clone();
            touched += 1;
        }
        if let Some(entry) = self.mine.iter_mut().find(|p| p.paste.id == updated.id) {
            entry.paste = updated.clone();
            touched += 1;
        }
        touched
    }

    /// Remove the matching entry (by id) from both views
    ///
    /// Returns the number of views changed.
    pub fn apply_removal(&mut self, id: &str) -> usize {
        let mut touched = 0;
        if let Some(pos) = self.all.iter().position(|p| p.id == id) {
            self.all.remove(pos);
            touched += 1;
        }
        if let Some(pos) = self.mine.iter().position(|p| p.paste.id == id) {
            self.mine.remove(pos);
            touched += 1;
        }
        touched
    }

    /// Look up a paste by id in either view
    pub fn find(&self, id: &str) -> Option<&Paste> {
        self.all
            .iter()
            .find(|p| p.id == id)
            .or_else(|| self.mine.iter().map(|p| &p.paste).find(|p| p.id == id))
    }

    /// Whether `uid` owns the paste, judged from the owner view
    pub fn is_owned_by(&self, id: &str, uid: &str) -> bool {
        self.mine
            .iter()
            .any(|p| p.paste.id == id && p.is_owned_by(uid))
    }

    /// Public pastes whose title contains `query` (case-insensitive)
    pub fn search_all(&self, query: &str) -> Vec<&Paste> {
        self.all.iter().filter(|p| p.matches_search(query)).collect()
    }

    /// Own pastes whose title contains `query` (case-insensitive)
    pub fn search_mine(&self, query: &str) -> Vec<&OwnedPaste> {
        self.mine
            .iter()
            .filter(|p| p.paste.matches_search(query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn paste(id: &str, title: &str) -> Paste {
        Paste {
            id: id.to_string(),
            title: title.to_string(),
            content: "content".to_string(),
            created_at: Utc::now(),
        }
    }

    fn owned(id: &str, title: &str, owner: &str) -> OwnedPaste {
        OwnedPaste {
            paste: paste(id, title),
            owner_id: owner.to_string(),
        }
    }

    #[test]
    fn test_append_created_goes_to_both_views() {
        let mut collection = PasteCollection::new();
        collection.append_created(owned("1", "Notes", "u1"));
        assert_eq!(collection.all().len(), 1);
        assert_eq!(collection.mine().len(), 1);
        assert!(collection.is_owned_by("1", "u1"));
        assert!(!collection.is_owned_by("1", "u2"));
    }

    #[test]
    fn test_has_title_case_insensitive() {
        let mut collection = PasteCollection::new();
        collection.replace_all(vec![paste("1", "Notes")]);
        assert!(collection.has_title("notes "));
        assert!(collection.has_title("NOTES"));
        assert!(!collection.has_title("Notes 2"));
    }

    #[test]
    fn test_apply_update_only_where_present() {
        let mut collection = PasteCollection::new();
        collection.replace_all(vec![paste("1", "A"), paste("2", "B")]);
        collection.replace_mine(vec![owned("2", "B", "u1")]);

        assert_eq!(collection.apply_update(&paste("1", "A2")), 1);
        assert_eq!(collection.apply_update(&paste("2", "B2")), 2);
        assert_eq!(collection.apply_update(&paste("9", "Z")), 0);

        assert_eq!(collection.find("1").unwrap().title, "A2");
        assert_eq!(collection.mine()[0].paste.title, "B2");
        assert_eq!(collection.mine()[0].owner_id, "u1");
    }

    #[test]
    fn test_apply_removal() {
        let mut collection = PasteCollection::new();
        collection.replace_all(vec![paste("1", "A"), paste("2", "B")]);
        collection.replace_mine(vec![owned("2", "B", "u1")]);

        assert_eq!(collection.apply_removal("2"), 2);
        assert_eq!(collection.apply_removal("missing"), 0);
        assert_eq!(collection.all().len(), 1);
        assert!(collection.mine().is_empty());
    }

    #[test]
    fn test_find_falls_back_to_mine() {
        let mut collection = PasteCollection::new();
        collection.replace_mine(vec![owned("7", "Mine only", "u1")]);
        assert_eq!(collection.find("7").unwrap().title, "Mine only");
        assert!(collection.find("8").is_none());
    }

    #[test]
    fn test_search() {
        let mut collection = PasteCollection::new();
        collection.replace_all(vec![paste("1", "Rust tips"), paste("2", "Shopping")]);
        collection.replace_mine(vec![owned("1", "Rust tips", "u1")]);

        assert_eq!(collection.search_all("RUST").len(), 1);
        assert_eq!(collection.search_all("").len(), 2);
        assert!(collection.search_mine("shop").is_empty());
    }
}
