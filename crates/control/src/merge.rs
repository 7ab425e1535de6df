//! Merge-patch semantics for network updates.
//!
//! A patch field overwrites the current value only when it is set: non-empty
//! strings, non-zero numbers and `Some` flags. Everything else is left alone,
//! so a patch cannot reset a field to empty or zero.

use netmesh_common::{Error, Network, NetworkPatch, Result};
use std::collections::BTreeSet;

/// What a merge changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    /// IPv4 or IPv6 range differs
    AddressRangeChanged,
    LocalRangeChanged,
    /// Any other tracked field differs
    FieldChanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<ChangeKind>);

impl ChangeSet {
    pub fn insert(&mut self, kind: ChangeKind) {
        self.0.insert(kind);
    }

    pub fn contains(&self, kind: ChangeKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChangeKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ChangeKind> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of merging a patch into a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub network: Network,
    pub changes: ChangeSet,
}

fn set_string(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

fn set_number(target: &mut i32, value: i32) {
    if value != 0 {
        *target = value;
    }
}

fn set_flag(target: &mut Option<bool>, value: Option<bool>) {
    if value.is_some() {
        *target = value;
    }
}

/// Compute the updated network for `patch` applied to `current`.
///
/// A non-empty `net_id` in the patch must match the current one.
pub fn merge(current: &Network, patch: &NetworkPatch) -> Result<Merged> {
    if !patch.net_id.is_empty() && patch.net_id != current.net_id {
        return Err(Error::Validation("NetID is not editable".to_string()));
    }

    let mut network = current.clone();
    set_string(&mut network.address_range, &patch.address_range);
    set_string(&mut network.address_range6, &patch.address_range6);
    set_string(&mut network.local_range, &patch.local_range);
    set_string(&mut network.display_name, &patch.display_name);
    set_string(&mut network.default_interface, &patch.default_interface);
    set_string(&mut network.default_post_up, &patch.default_post_up);
    set_string(&mut network.default_post_down, &patch.default_post_down);
    set_number(&mut network.default_listen_port, patch.default_listen_port);
    set_number(&mut network.default_keepalive, patch.default_keepalive);
    set_number(&mut network.default_check_in_interval, patch.default_check_in_interval);
    set_flag(&mut network.is_local, patch.is_local);
    set_flag(&mut network.is_dual_stack, patch.is_dual_stack);
    set_flag(&mut network.allow_manual_signup, patch.allow_manual_signup);

    let changes = classify(current, &network);
    if !changes.is_empty() {
        network.touch_network();
    }

    Ok(Merged { network, changes })
}

fn classify(before: &Network, after: &Network) -> ChangeSet {
    let mut changes = ChangeSet::default();

    if before.address_range != after.address_range || before.address_range6 != after.address_range6 {
        changes.insert(ChangeKind::AddressRangeChanged);
    }
    if before.local_range != after.local_range {
        changes.insert(ChangeKind::LocalRangeChanged);
    }

    let fields_differ = before.display_name != after.display_name
        || before.default_interface != after.default_interface
        || before.default_post_up != after.default_post_up
        || before.default_post_down != after.default_post_down
        || before.default_listen_port != after.default_listen_port
        || before.default_keepalive != after.default_keepalive
        || before.default_check_in_interval != after.default_check_in_interval
        || before.is_local != after.is_local
        || before.is_dual_stack != after.is_dual_stack
        || before.allow_manual_signup != after.allow_manual_signup;
    if fields_differ {
        changes.insert(ChangeKind::FieldChanged);
    }

    changes
}
