//! Structural co-traversal of two descriptor sets.
//!
//! [`compare`] walks both graphs top-down and hands every matched pair of
//! descriptors to a [`ComparingVisitor`]. Either side of a pair may be absent.
//! Children are matched by fully-qualified name, with two exceptions: enum
//! values are matched by number (by name when either enum allows aliases), and
//! fields left unmatched by name are paired by number so a rename surfaces as
//! a single pair.

use crate::descriptor::{
    Descriptor, DescriptorSet, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FileDescriptor, MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor,
};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A matched pair of descriptors; at least one side is present.
#[derive(Debug)]
pub struct Pair<'a, T> {
    pub current: Option<&'a T>,
    pub candidate: Option<&'a T>,
}

impl<T> Clone for Pair<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Pair<'_, T> {}

impl<'a, T> Pair<'a, T> {
    pub fn new(current: Option<&'a T>, candidate: Option<&'a T>) -> Self {
        Self { current, candidate }
    }
}

impl<'a, T: Descriptor> Pair<'a, T> {
    /// Classifies the pair: `None` when both sides are present and equal.
    pub fn change(&self) -> Option<Change<'a, T>> {
        match (self.current, self.candidate) {
            (Some(current), None) => Some(Change::Removed(current)),
            (None, Some(candidate)) => Some(Change::Added(candidate)),
            (Some(current), Some(candidate)) if !current.structurally_eq(candidate) => {
                Some(Change::Changed { current, candidate })
            }
            _ => None,
        }
    }
}

/// Lifecycle of one descriptor between the current and candidate state.
#[derive(Debug)]
pub enum Change<'a, T> {
    Added(&'a T),
    Removed(&'a T),
    Changed { current: &'a T, candidate: &'a T },
}

impl<T> Clone for Change<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Change<'_, T> {}

impl<'a, T> Change<'a, T> {
    pub fn current(&self) -> Option<&'a T> {
        match self {
            Change::Added(_) => None,
            Change::Removed(current) | Change::Changed { current, .. } => Some(current),
        }
    }

    pub fn candidate(&self) -> Option<&'a T> {
        match self {
            Change::Removed(_) => None,
            Change::Added(candidate) | Change::Changed { candidate, .. } => Some(candidate),
        }
    }

    /// The descriptor a change is about, preferring the candidate side.
    pub fn subject(&self) -> &'a T {
        match self {
            Change::Added(d) | Change::Removed(d) => d,
            Change::Changed { candidate, .. } => candidate,
        }
    }
}

/// Receives matched pairs. Every method defaults to doing nothing.
pub trait ComparingVisitor<'a> {
    fn visit_file(&mut self, _pair: Pair<'a, FileDescriptor>) {}

    fn visit_message(&mut self, _pair: Pair<'a, MessageDescriptor>) {}

    /// `parents` are the containing messages on each side.
    fn visit_field(
        &mut self,
        _pair: Pair<'a, FieldDescriptor>,
        _parents: Pair<'a, MessageDescriptor>,
    ) {
    }

    fn visit_oneof(
        &mut self,
        _pair: Pair<'a, OneofDescriptor>,
        _parents: Pair<'a, MessageDescriptor>,
    ) {
    }

    fn visit_enum(&mut self, _pair: Pair<'a, EnumDescriptor>) {}

    /// `parents` are the containing enums on each side.
    fn visit_enum_value(
        &mut self,
        _pair: Pair<'a, EnumValueDescriptor>,
        _parents: Pair<'a, EnumDescriptor>,
    ) {
    }

    fn visit_service(&mut self, _pair: Pair<'a, ServiceDescriptor>) {}

    fn visit_method(
        &mut self,
        _pair: Pair<'a, MethodDescriptor>,
        _parents: Pair<'a, ServiceDescriptor>,
    ) {
    }
}

/// Walks `current` and `candidate` in parallel, reporting every matched pair.
pub fn compare<'a, V>(current: &'a DescriptorSet, candidate: &'a DescriptorSet, visitor: &mut V)
where
    V: ComparingVisitor<'a> + ?Sized,
{
    Differ {
        current,
        candidate,
        visitor,
    }
    .run();
}

struct Differ<'a, 'v, V: ?Sized> {
    current: &'a DescriptorSet,
    candidate: &'a DescriptorSet,
    visitor: &'v mut V,
}

impl<'a, V> Differ<'a, '_, V>
where
    V: ComparingVisitor<'a> + ?Sized,
{
    fn run(&mut self) {
        let (current, candidate) = (self.current, self.candidate);

        for pair in group_by(current.files(), candidate.files(), |f| f.name.clone()) {
            self.visitor.visit_file(pair);
        }

        // Top-level types are matched across files so that moving a type to
        // another file reads as a change, not a removal plus an addition.
        let messages = group_by(
            current.files().flat_map(|f| current.messages_of(f)),
            candidate.files().flat_map(|f| candidate.messages_of(f)),
            |m| m.full_name.clone(),
        );
        for pair in messages {
            self.message(pair);
        }

        let enums = group_by(
            current.files().flat_map(|f| current.enums_of(f)),
            candidate.files().flat_map(|f| candidate.enums_of(f)),
            |e| e.full_name.clone(),
        );
        for pair in enums {
            self.enumeration(pair);
        }

        let services = group_by(
            current.files().flat_map(|f| f.services.iter()),
            candidate.files().flat_map(|f| f.services.iter()),
            |s| s.full_name.clone(),
        );
        for pair in services {
            self.service(pair);
        }
    }

    fn message(&mut self, pair: Pair<'a, MessageDescriptor>) {
        let (current, candidate) = (self.current, self.candidate);
        self.visitor.visit_message(pair);

        for field in group_fields(
            pair.current.map(|m| m.fields.as_slice()).unwrap_or_default(),
            pair.candidate.map(|m| m.fields.as_slice()).unwrap_or_default(),
        ) {
            self.visitor.visit_field(field, pair);
        }

        for oneof in group_by(
            pair.current.into_iter().flat_map(|m| m.oneofs.iter()),
            pair.candidate.into_iter().flat_map(|m| m.oneofs.iter()),
            |o| o.full_name.clone(),
        ) {
            self.visitor.visit_oneof(oneof, pair);
        }

        for nested in group_by(
            pair.current.into_iter().flat_map(|m| current.nested_enums(m)),
            pair.candidate.into_iter().flat_map(|m| candidate.nested_enums(m)),
            |e| e.full_name.clone(),
        ) {
            self.enumeration(nested);
        }

        for nested in group_by(
            pair.current.into_iter().flat_map(|m| current.nested_messages(m)),
            pair.candidate.into_iter().flat_map(|m| candidate.nested_messages(m)),
            |m| m.full_name.clone(),
        ) {
            self.message(nested);
        }
    }

    fn enumeration(&mut self, pair: Pair<'a, EnumDescriptor>) {
        self.visitor.visit_enum(pair);

        let current_values = pair.current.into_iter().flat_map(|e| e.values.iter());
        let candidate_values = pair.candidate.into_iter().flat_map(|e| e.values.iter());
        let aliased = pair.current.is_some_and(|e| e.allow_alias())
            || pair.candidate.is_some_and(|e| e.allow_alias());
        let values = if aliased {
            group_by(current_values, candidate_values, |v| ValueKey::Name(v.name.clone()))
        } else {
            group_by(current_values, candidate_values, |v| ValueKey::Number(v.number))
        };
        for value in values {
            self.visitor.visit_enum_value(value, pair);
        }
    }

    fn service(&mut self, pair: Pair<'a, ServiceDescriptor>) {
        self.visitor.visit_service(pair);
        for method in group_by(
            pair.current.into_iter().flat_map(|s| s.methods.iter()),
            pair.candidate.into_iter().flat_map(|s| s.methods.iter()),
            |m| m.full_name.clone(),
        ) {
            self.visitor.visit_method(method, pair);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Number(i32),
    Name(String),
}

/// Matches two child lists by key. Pairs come out in current order, followed
/// by candidate-only entries in candidate order. With duplicate keys on one
/// side (aliased enum values sharing a number), the first entry wins.
fn group_by<'a, T, K, F>(
    current: impl IntoIterator<Item = &'a T>,
    candidate: impl IntoIterator<Item = &'a T>,
    key: F,
) -> Vec<Pair<'a, T>>
where
    T: 'a,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut candidates: Vec<&'a T> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();
    for item in candidate {
        if let Entry::Vacant(slot) = index.entry(key(item)) {
            slot.insert(candidates.len());
            candidates.push(item);
        }
    }

    let mut taken = vec![false; candidates.len()];
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for item in current {
        let k = key(item);
        let matched = index.get(&k).copied();
        if !seen.insert(k) {
            continue;
        }
        if let Some(i) = matched {
            taken[i] = true;
        }
        pairs.push(Pair::new(Some(item), matched.map(|i| candidates[i])));
    }
    pairs.extend(
        candidates
            .into_iter()
            .zip(taken)
            .filter(|(_, taken)| !taken)
            .map(|(item, _)| Pair::new(None, Some(item))),
    );
    pairs
}

/// Matches fields by name, then pairs the leftovers on each side by number.
///
/// A renamed field therefore arrives as one changed pair, never as a removal
/// plus an addition. Rules that only look at added fields, such as the field
/// naming check, do not see the new name.
fn group_fields<'a>(
    current: &'a [FieldDescriptor],
    candidate: &'a [FieldDescriptor],
) -> Vec<Pair<'a, FieldDescriptor>> {
    let mut pairs = Vec::new();
    let mut orphans = Vec::new();
    for pair in group_by(current, candidate, |f| f.name.clone()) {
        match pair.current {
            Some(_) => pairs.push(pair),
            None => orphans.push(pair.candidate),
        }
    }

    for pair in pairs.iter_mut().filter(|p| p.candidate.is_none()) {
        let Some(field) = pair.current else { continue };
        let slot = orphans
            .iter_mut()
            .find(|slot| slot.is_some_and(|c| c.number == field.number));
        if let Some(slot) = slot {
            pair.candidate = slot.take();
        }
    }
    pairs.extend(orphans.into_iter().flatten().map(|f| Pair::new(None, Some(f))));
    pairs
}
