//! Fresh object identifiers that do not collide with live objects.
//!
//! There is no persistent counter: every request scans the state at call time, so an id
//! becomes reusable as soon as the delete that retires it has been committed.

use std::collections::BTreeMap;
use std::fmt;

use crate::ReplayError;

/// Candidates tried before giving up.
pub const MAX_ID_CANDIDATES: u32 = 1 << 16;

/// Deterministic starting point for a namespace tag.
pub fn seed_for(tag: char) -> u32 {
    (tag as u32 & 0xff) << 16
}

/// Return the first id, starting at [`seed_for`]`(tag)`, for which no predicate in `live`
/// reports a live object. Zero is never returned.
pub fn unused_id(tag: char, live: &[&dyn Fn(u32) -> bool]) -> Result<u32, ReplayError> {
    first_unused(tag, |id| live.iter().any(|is_live| is_live(id)))
}

fn first_unused(tag: char, is_live: impl Fn(u32) -> bool) -> Result<u32, ReplayError> {
    let seed = seed_for(tag);
    (0..MAX_ID_CANDIDATES)
        .map(|i| seed.wrapping_add(i))
        .find(|&id| id != 0 && !is_live(id))
        .ok_or(ReplayError::IdExhausted {
            tag,
            searched: MAX_ID_CANDIDATES,
        })
}

/// Liveness test for one resource map.
pub type LivePredicate<S> = fn(&S, u32) -> bool;

/// One namespace: every resource map whose ids must stay disjoint.
pub struct Namespace<S> {
    pub tag: char,
    pub kinds: Vec<(&'static str, LivePredicate<S>)>,
}

impl<S> fmt::Debug for Namespace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.kinds.iter().map(|(name, _)| *name).collect();
        f.debug_struct("Namespace")
            .field("tag", &self.tag)
            .field("kinds", &kinds)
            .finish()
    }
}

/// Tag -> namespace table, built once per session and passed to whoever allocates ids.
pub struct Namespaces<S> {
    by_tag: BTreeMap<char, Namespace<S>>,
}

impl<S> Default for Namespaces<S> {
    fn default() -> Self {
        Self {
            by_tag: BTreeMap::new(),
        }
    }
}

impl<S> fmt::Debug for Namespaces<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_tag.values()).finish()
    }
}

impl<S> Namespaces<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tag` as covering the given resource maps.
    ///
    /// Two tags that list the same kinds share one id space.
    pub fn register(mut self, tag: char, kinds: Vec<(&'static str, LivePredicate<S>)>) -> Self {
        self.by_tag.insert(tag, Namespace { tag, kinds });
        self
    }

    pub fn get(&self, tag: char) -> Option<&Namespace<S>> {
        self.by_tag.get(&tag)
    }

    /// Allocate an id for `tag` that is not live in any of its resource maps.
    pub fn unused_id(&self, tag: char, state: &S) -> Result<u32, ReplayError> {
        let ns = self.get(tag).ok_or(ReplayError::UnknownNamespace(tag))?;
        first_unused(tag, |id| ns.kinds.iter().any(|(_, is_live)| is_live(state, id)))
    }
}
