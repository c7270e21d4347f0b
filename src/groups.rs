//! Pure helpers for the group-order list and visibility sets.
//!
//! These functions operate on the decoded in-memory representations; the
//! database layer applies their results back to the playlist row together
//! with the matching channel updates, inside one transaction.

/// Sentinel group label for channels with an empty `group_title`.
pub const DEFAULT_GROUP_NAME: &str = "未分类";

/// Pseudo-group representing "all channels" in the editor. It is not a real
/// group and can never be hidden.
pub const ALL_GROUPS: &str = "全部";

/// Replace `from` with `to` in the group-order list, keeping its position.
/// Returns `true` if the list changed.
pub fn rename_in_order(order: &mut [String], from: &str, to: &str) -> bool {
    let mut changed = false;
    for name in order.iter_mut() {
        if name == from {
            *name = to.to_string();
            changed = true;
        }
    }
    changed
}

/// Remove a group name from the group-order list.
pub fn remove_from_order(order: &mut Vec<String>, name: &str) {
    order.retain(|g| g != name);
}

/// Append a group to the order list if it is not already present.
/// Returns `true` if the group was appended.
pub fn append_if_missing(order: &mut Vec<String>, name: &str) -> bool {
    if order.iter().any(|g| g == name) {
        return false;
    }
    order.push(name.to_string());
    true
}

/// Drop entries that must never be hidden before persisting a hidden-groups
/// update. The "all channels" pseudo-group is the only such entry.
pub fn sanitize_hidden_groups(mut hidden: Vec<String>) -> Vec<String> {
    hidden.retain(|g| g != ALL_GROUPS);
    hidden
}
