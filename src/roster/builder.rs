//! Role-grouped roster rendering.
//!
//! Builds the summary text from matched intro entries plus the guild's
//! member/role graph. Works on plain snapshot types rather than
//! serenity's cache so grouping and sorting are testable without a
//! gateway connection; `sync::engine` builds the snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};

use serenity::model::id::{RoleId, UserId};

/// Header line of the summary.
pub const SUMMARY_HEADER: &str = "📜 **รายชื่อสมาชิกกิลด์**";

/// Label prefixed to a real in-game name.
pub const IGN_LABEL: &str = "ชื่อในเกม";

/// Marker for members who have not posted an introduction yet.
pub const NOT_INTRODUCED_NOTE: &str = "ยังไม่แนะนำตัว";

/// Snapshot of one guild member.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub is_bot: bool,
    /// Role ids held by the member, excluding the implicit @everyone role.
    pub role_ids: Vec<RoleId>,
}

/// Snapshot of one guild role.
#[derive(Debug, Clone)]
pub struct RoleInfo {
    pub name: String,
    pub position: u16,
}

#[derive(Debug, Clone)]
struct RosterEntry {
    user_id: UserId,
    display_name: String,
    is_placeholder: bool,
}

/// Render the grouped member roster.
///
/// Starts from the matched intro entries, backfills a placeholder row
/// for every non-bot member who holds at least one real role and none
/// of the excluded roles, groups by each member's highest-positioned
/// role (highest group first), and sorts placeholder rows last within a
/// group. Returns `None` when nothing survives filtering.
pub fn build_roster(
    profiles: &HashMap<UserId, MemberProfile>,
    intro_map: &HashMap<UserId, String>,
    roles: &HashMap<RoleId, RoleInfo>,
    excluded_role_ids: &HashSet<RoleId>,
) -> Option<String> {
    let mut combined: HashMap<UserId, RosterEntry> = HashMap::new();

    for (user_id, ign) in intro_map {
        if !profiles.contains_key(user_id) {
            continue;
        }
        combined.insert(
            *user_id,
            RosterEntry {
                user_id: *user_id,
                display_name: ign.clone(),
                is_placeholder: false,
            },
        );
    }

    for profile in profiles.values() {
        if profile.is_bot {
            continue;
        }
        if profile
            .role_ids
            .iter()
            .any(|r| excluded_role_ids.contains(r))
        {
            continue;
        }
        if combined.contains_key(&profile.user_id) {
            continue;
        }
        // Members holding only @everyone are not participants yet.
        if profile.role_ids.is_empty() {
            continue;
        }
        combined.insert(
            profile.user_id,
            RosterEntry {
                user_id: profile.user_id,
                display_name: profile.display_name.clone(),
                is_placeholder: true,
            },
        );
    }

    if combined.is_empty() {
        return None;
    }

    // Group by highest-positioned role; a negated position keys the
    // map so higher roles iterate first, with the role name breaking
    // ties deterministically.
    let mut groups: BTreeMap<(i64, String), Vec<RosterEntry>> = BTreeMap::new();

    for entry in combined.into_values() {
        let profile = match profiles.get(&entry.user_id) {
            Some(profile) => profile,
            None => continue,
        };
        let top_role = profile
            .role_ids
            .iter()
            .filter_map(|id| roles.get(id))
            .max_by_key(|role| role.position);
        let top_role = match top_role {
            // No qualifying role left, nothing to group under.
            None => continue,
            Some(role) => role,
        };
        groups
            .entry((-(top_role.position as i64), top_role.name.clone()))
            .or_default()
            .push(entry);
    }

    if groups.is_empty() {
        return None;
    }

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("{}\n", SUMMARY_HEADER));

    for ((_, group_name), mut members) in groups {
        lines.push(format!("**{}**", group_name));

        members.sort_by_key(|entry| (entry.is_placeholder, entry.display_name.to_lowercase()));

        for entry in &members {
            if entry.is_placeholder {
                lines.push(format!(
                    "- <@{}> — ({})",
                    entry.user_id.get(),
                    NOT_INTRODUCED_NOTE
                ));
            } else {
                lines.push(format!(
                    "- <@{}> — {}: {}",
                    entry.user_id.get(),
                    IGN_LABEL,
                    entry.display_name
                ));
            }
        }
        lines.push(String::new());
    }

    Some(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: u64, name: &str, bot: bool, roles: &[u64]) -> (UserId, MemberProfile) {
        (
            UserId::new(id),
            MemberProfile {
                user_id: UserId::new(id),
                display_name: name.to_string(),
                is_bot: bot,
                role_ids: roles.iter().map(|r| RoleId::new(*r)).collect(),
            },
        )
    }

    fn role(id: u64, name: &str, position: u16) -> (RoleId, RoleInfo) {
        (
            RoleId::new(id),
            RoleInfo {
                name: name.to_string(),
                position,
            },
        )
    }

    #[test]
    fn test_higher_role_group_renders_first() {
        let profiles: HashMap<_, _> = [
            profile(1, "alice", false, &[10]),
            profile(2, "bob", false, &[20]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1), role(20, "Officer", 5)]
            .into_iter()
            .collect();
        let intro_map: HashMap<_, _> = [
            (UserId::new(1), "Alice".to_string()),
            (UserId::new(2), "Bob".to_string()),
        ]
        .into_iter()
        .collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        let officer = text.find("**Officer**").unwrap();
        let member = text.find("**Member**").unwrap();
        assert!(officer < member);
        assert!(text.starts_with(SUMMARY_HEADER));
    }

    #[test]
    fn test_everyone_only_member_omitted() {
        let profiles: HashMap<_, _> = [
            profile(1, "alice", false, &[10]),
            profile(2, "lurker", false, &[]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        let intro_map: HashMap<_, _> = [(UserId::new(1), "Alice".to_string())].into_iter().collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        assert!(text.contains("<@1>"));
        assert!(!text.contains("<@2>"));
    }

    #[test]
    fn test_placeholder_backfill_and_sorted_last() {
        let profiles: HashMap<_, _> = [
            profile(1, "zoe", false, &[10]),
            profile(2, "adam", false, &[10]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        // Only zoe introduced; adam gets a placeholder row at the end
        // even though "adam" sorts before "Zoe".
        let intro_map: HashMap<_, _> = [(UserId::new(1), "Zoe".to_string())].into_iter().collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        let zoe = text.find("<@1>").unwrap();
        let adam = text.find("<@2>").unwrap();
        assert!(zoe < adam);
        assert!(text.contains(&format!("({})", NOT_INTRODUCED_NOTE)));
    }

    #[test]
    fn test_excluded_role_member_not_backfilled() {
        let profiles: HashMap<_, _> = [
            profile(1, "alice", false, &[10]),
            profile(2, "hidden", false, &[10, 30]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1), role(30, "Hidden", 2)]
            .into_iter()
            .collect();
        let intro_map: HashMap<_, _> = [(UserId::new(1), "Alice".to_string())].into_iter().collect();
        let excluded: HashSet<_> = [RoleId::new(30)].into_iter().collect();

        let text = build_roster(&profiles, &intro_map, &roles, &excluded).unwrap();
        assert!(!text.contains("<@2>"));
    }

    #[test]
    fn test_bots_never_backfilled() {
        let profiles: HashMap<_, _> = [
            profile(1, "alice", false, &[10]),
            profile(2, "beep", true, &[10]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        let intro_map: HashMap<_, _> = [(UserId::new(1), "Alice".to_string())].into_iter().collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        assert!(!text.contains("<@2>"));
    }

    #[test]
    fn test_member_appears_once_with_latest_name() {
        // The intro map already carries "newest wins" semantics; the
        // builder must render exactly one row for the member.
        let profiles: HashMap<_, _> = [profile(1, "alice", false, &[10])].into_iter().collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        let intro_map: HashMap<_, _> =
            [(UserId::new(1), "NewName".to_string())].into_iter().collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        assert_eq!(text.matches("<@1>").count(), 1);
        assert!(text.contains("NewName"));
    }

    #[test]
    fn test_intro_member_gone_from_guild_dropped() {
        let profiles: HashMap<_, _> = [profile(1, "alice", false, &[10])].into_iter().collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        let intro_map: HashMap<_, _> = [
            (UserId::new(1), "Alice".to_string()),
            (UserId::new(99), "Ghost".to_string()),
        ]
        .into_iter()
        .collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        assert!(!text.contains("Ghost"));
    }

    #[test]
    fn test_nothing_to_render_returns_none() {
        let profiles: HashMap<_, _> = [profile(1, "lurker", false, &[])].into_iter().collect();
        let roles: HashMap<RoleId, RoleInfo> = HashMap::new();
        let intro_map: HashMap<UserId, String> = HashMap::new();

        assert!(build_roster(&profiles, &intro_map, &roles, &HashSet::new()).is_none());
    }

    #[test]
    fn test_names_sorted_case_insensitively() {
        let profiles: HashMap<_, _> = [
            profile(1, "a", false, &[10]),
            profile(2, "b", false, &[10]),
            profile(3, "c", false, &[10]),
        ]
        .into_iter()
        .collect();
        let roles: HashMap<_, _> = [role(10, "Member", 1)].into_iter().collect();
        let intro_map: HashMap<_, _> = [
            (UserId::new(1), "banana".to_string()),
            (UserId::new(2), "Apple".to_string()),
            (UserId::new(3), "cherry".to_string()),
        ]
        .into_iter()
        .collect();

        let text = build_roster(&profiles, &intro_map, &roles, &HashSet::new()).unwrap();
        let apple = text.find("Apple").unwrap();
        let banana = text.find("banana").unwrap();
        let cherry = text.find("cherry").unwrap();
        assert!(apple < banana && banana < cherry);
    }
}
