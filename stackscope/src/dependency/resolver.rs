//! # Dependency Resolver
//!
//! Annotates thread records from a lock graph snapshot.
//!
//! ## Pass 1: direct facts
//!
//! For every row `t` of the graph whose thread has a record:
//! - the `-1` column (last one wins) is the resource `t` waits on
//! - every positive column is a resource `t` holds; composites such as
//!   `MultiRule[R1@1a,R2@2b]` are split so each constituent is attributable
//!
//! Held resources of those rows go into one resource → owner map. Rows of
//! threads missing from the thread view (infrastructure, empty stack) never
//! own anything.
//!
//! ## Pass 2: ownership
//!
//! ```text
//! waited "Rule@7f" ──► owners["Rule@7f"]?  ── yes ──► Resolved(owner)
//!                           │ no
//!                           ▼
//!         owners with class "Rule" ── 1 thread ──► Resolved(owner)
//!                                  ── 2+      ──► Ambiguous(candidates)
//!                                  ── 0       ──► Unknown
//! ```
//!
//! Resource conflicts are decided on the monitored side by a comparison this
//! resolver cannot run, so only identical identifiers give a certain answer.
//! The class-name match is a labelled guess and never picks one of several.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use stackscope_common::{LockGraph, COMPOSITE_RESOURCE_HEADER, LOCK_NONE, LOCK_WAITING};

use crate::domain::{CompositeResourceError, LockGraphError};
use crate::thread_data::ThreadElement;

/// Owner of a waited resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerResolution {
    /// A single owning thread was found
    Resolved(String),
    /// Several threads hold resources of the same class; candidates sorted
    Ambiguous(Vec<String>),
    /// Nobody is recorded as holding anything similar
    Unknown,
}

impl fmt::Display for OwnerResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerResolution::Resolved(owner) => f.write_str(owner),
            OwnerResolution::Ambiguous(candidates) => {
                write!(f, "ambiguous, candidates = {{{}}}", candidates.join(", "))
            }
            OwnerResolution::Unknown => f.write_str("owner unknown"),
        }
    }
}

/// Check that the graph shape agrees with its name lists.
///
/// # Errors
/// Returns the first dimension mismatch found
pub fn validate(graph: &LockGraph) -> Result<(), LockGraphError> {
    if graph.graph.is_empty() {
        return Err(LockGraphError::Empty);
    }
    if graph.graph.len() != graph.owning_thread_names.len() {
        return Err(LockGraphError::RowCountMismatch {
            rows: graph.graph.len(),
            threads: graph.owning_thread_names.len(),
        });
    }
    for (row, cells) in graph.graph.iter().enumerate() {
        if cells.len() != graph.resource_names.len() {
            return Err(LockGraphError::ColumnCountMismatch {
                row,
                columns: cells.len(),
                resources: graph.resource_names.len(),
            });
        }
    }
    Ok(())
}

/// Split `MultiRule[a,b,c]` into `["a", "b", "c"]`.
///
/// # Errors
/// Returns an error if the closing bracket is missing or no constituent is named
pub fn split_composite(resource: &str) -> Result<Vec<&str>, CompositeResourceError> {
    let malformed = || CompositeResourceError::Malformed(resource.to_owned());
    let body = resource
        .strip_prefix(COMPOSITE_RESOURCE_HEADER)
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let parts: Vec<&str> = body.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Err(malformed());
    }
    Ok(parts)
}

/// Annotate `threads` from `graph`. Returns false if the graph was unusable,
/// in which case no record is touched.
pub fn resolve(threads: &mut [ThreadElement], graph: &LockGraph) -> bool {
    if let Err(e) = validate(graph) {
        debug!("Lock graph unsupported, skipping dependency resolution: {e}");
        return false;
    }

    let recorded: HashSet<&str> = threads.iter().map(|t| t.name.as_str()).collect();
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    let mut waits: BTreeMap<&str, &str> = BTreeMap::new();
    let mut holds: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (thread_name, cells) in graph.owning_thread_names.iter().zip(&graph.graph) {
        if !recorded.contains(thread_name.as_str()) {
            continue;
        }
        for (resource, &cell) in graph.resource_names.iter().zip(cells) {
            if cell == LOCK_WAITING {
                waits.insert(thread_name, resource);
            } else if cell > LOCK_NONE {
                for held in held_constituents(resource) {
                    owners.insert(held, thread_name);
                    holds.entry(thread_name).or_default().push(held);
                }
            }
        }
    }

    for thread in threads.iter_mut() {
        thread.held_resources = holds
            .get(thread.name.as_str())
            .map(|held| held.iter().map(|r| (*r).to_owned()).collect())
            .unwrap_or_default();
        match waits.get(thread.name.as_str()) {
            Some(waited) => {
                thread.waited_resource = Some((*waited).to_owned());
                thread.resource_owner = Some(search_owner(waited, &owners));
            }
            None => {
                thread.waited_resource = None;
                thread.resource_owner = None;
            }
        }
    }
    true
}

/// Constituents of a held resource; a malformed composite yields none.
fn held_constituents(resource: &str) -> Vec<&str> {
    if !resource.starts_with(COMPOSITE_RESOURCE_HEADER) {
        return vec![resource];
    }
    match split_composite(resource) {
        Ok(parts) => parts,
        Err(e) => {
            warn_once(resource, &e);
            Vec::new()
        }
    }
}

fn search_owner(waited: &str, owners: &BTreeMap<&str, &str>) -> OwnerResolution {
    if let Some(owner) = owners.get(waited) {
        return OwnerResolution::Resolved((*owner).to_owned());
    }

    let class = class_of(waited);
    let candidates: BTreeSet<&str> = owners
        .iter()
        .filter(|(resource, _)| class_of(resource) == class)
        .map(|(_, owner)| *owner)
        .collect();

    let mut candidates = candidates.into_iter();
    match (candidates.next(), candidates.next()) {
        (None, _) => OwnerResolution::Unknown,
        (Some(owner), None) => OwnerResolution::Resolved(owner.to_owned()),
        (Some(first), Some(second)) => {
            let mut all = vec![first.to_owned(), second.to_owned()];
            all.extend(candidates.map(str::to_owned));
            OwnerResolution::Ambiguous(all)
        }
    }
}

/// `com.foo.Rule@1f2e` → `com.foo.Rule`
fn class_of(resource: &str) -> &str {
    resource.split_once('@').map_or(resource, |(class, _)| class)
}

fn warn_once(resource: &str, error: &CompositeResourceError) {
    static REPORTED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let mut reported =
        REPORTED.get_or_init(Mutex::default).lock().unwrap_or_else(PoisonError::into_inner);
    if reported.insert(resource.to_owned()) {
        warn!("{error}, skipping it");
    }
}
