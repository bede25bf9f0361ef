use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::budget::BudgetTier;
use crate::domain::employee::{Employee, EmployeeId, OrgLevel};

/// Read-only snapshot of the employee directory. Constructed from a full
/// listing and injected into the resolver, so routing is a pure function of
/// the snapshot rather than of ambient lookup state.
#[derive(Clone, Debug, Default)]
pub struct OrgDirectory {
    employees_by_id: HashMap<String, Employee>,
}

impl OrgDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        let employees_by_id =
            employees.into_iter().map(|employee| (employee.id.0.clone(), employee)).collect();
        Self { employees_by_id }
    }

    pub fn get(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees_by_id.get(&id.0)
    }

    pub fn len(&self) -> usize {
        self.employees_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees_by_id.is_empty()
    }

    /// Non-admin employees at exactly `level`, ordered by id so that fallback
    /// selection is deterministic across snapshots with identical content.
    fn approver_candidates_at_level(&self, level: OrgLevel) -> Vec<&Employee> {
        let mut candidates: Vec<&Employee> = self
            .employees_by_id
            .values()
            .filter(|employee| employee.can_approve() && employee.level == level)
            .collect();
        candidates.sort_by(|left, right| left.id.cmp(&right.id));
        candidates
    }
}

/// Ordered view over budget tier configuration. Tiers are kept in ascending
/// `min_amount` order; when misconfigured data lets several active tiers
/// overlap, the first match in that order wins.
#[derive(Clone, Debug, Default)]
pub struct BudgetTierTable {
    tiers: Vec<BudgetTier>,
}

impl BudgetTierTable {
    pub fn new(mut tiers: Vec<BudgetTier>) -> Self {
        tiers.sort_by(|left, right| {
            left.min_amount.cmp(&right.min_amount).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Self { tiers }
    }

    pub fn tier_for_amount(&self, amount: Decimal) -> Option<&BudgetTier> {
        self.tiers.iter().find(|tier| tier.is_active && tier.contains(amount))
    }

    pub fn active_tiers(&self) -> impl Iterator<Item = &BudgetTier> {
        self.tiers.iter().filter(|tier| tier.is_active)
    }
}

/// One resolved chain entry with display metadata, for previewing a flow
/// before submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStop {
    pub approver_id: EmployeeId,
    pub name: String,
    pub level: OrgLevel,
}

/// Resolves the ordered approver chain for a submitter and amount.
///
/// The resolver never fails: configuration gaps (no matching tier, broken
/// manager links, vacant levels) degrade to a shorter chain instead of an
/// error, and an empty chain is a valid result meaning no approval is
/// required.
#[derive(Clone, Debug)]
pub struct ChainResolver {
    directory: OrgDirectory,
    tiers: BudgetTierTable,
}

impl ChainResolver {
    pub fn new(directory: OrgDirectory, tiers: BudgetTierTable) -> Self {
        Self { directory, tiers }
    }

    pub fn directory(&self) -> &OrgDirectory {
        &self.directory
    }

    pub fn tiers(&self) -> &BudgetTierTable {
        &self.tiers
    }

    /// Ordered approver ids required for `amount` submitted by
    /// `submitter_id`. Deterministic for a fixed pair of snapshots.
    pub fn resolve_chain(&self, submitter_id: &EmployeeId, amount: Decimal) -> Vec<EmployeeId> {
        let Some(submitter) = self.directory.get(submitter_id) else {
            return Vec::new();
        };

        let Some(tier) = self.tiers.tier_for_amount(amount) else {
            return self.minimal_approval_chain(submitter);
        };

        let mut chain: Vec<EmployeeId> = Vec::new();
        let mut position = submitter;

        for level in tier.levels_in_resolution_order() {
            let approver = self
                .ancestor_at_level(position, level)
                .or_else(|| self.anyone_at_level(level, submitter_id, &chain));

            if let Some(approver) = approver {
                if approver.id != *submitter_id && !chain.contains(&approver.id) {
                    chain.push(approver.id.clone());
                    position = approver;
                }
            }
            // No approver at this level: the level is skipped and the chain
            // simply omits it.
        }

        chain
    }

    /// Resolved chain with names and levels attached, for submission-time
    /// preview surfaces.
    pub fn preview_chain(&self, submitter_id: &EmployeeId, amount: Decimal) -> Vec<ChainStop> {
        self.resolve_chain(submitter_id, amount)
            .into_iter()
            .map(|approver_id| match self.directory.get(&approver_id) {
                Some(employee) => ChainStop {
                    approver_id,
                    name: employee.name.clone(),
                    level: employee.level,
                },
                None => ChainStop { approver_id, name: "Unknown".to_string(), level: 0 },
            })
            .collect()
    }

    /// No-tier fallback: the submitter's direct manager alone, or nothing.
    fn minimal_approval_chain(&self, submitter: &Employee) -> Vec<EmployeeId> {
        submitter
            .manager_id
            .as_ref()
            .and_then(|manager_id| self.directory.get(manager_id))
            .filter(|manager| manager.can_approve())
            .map(|manager| vec![manager.id.clone()])
            .unwrap_or_default()
    }

    /// First ancestor of `from` at exactly `level`, walking manager
    /// references upward. The walk is bounded by a visited set (manager data
    /// is external configuration and may contain cycles) and only traverses
    /// non-admin employees; a dangling link or an admin ancestor ends it.
    fn ancestor_at_level(&self, from: &Employee, level: OrgLevel) -> Option<&Employee> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(from.id.0.as_str());

        let mut current = from;
        while let Some(manager_id) = &current.manager_id {
            if !visited.insert(manager_id.0.as_str()) {
                break;
            }
            let Some(manager) = self.directory.get(manager_id) else {
                break;
            };
            if !manager.can_approve() {
                break;
            }
            if manager.level == level {
                return Some(manager);
            }
            current = manager;
        }

        None
    }

    /// Hierarchy miss fallback: any non-admin employee at the exact level,
    /// excluding the submitter and anyone already placed in the chain.
    fn anyone_at_level(
        &self,
        level: OrgLevel,
        submitter_id: &EmployeeId,
        chain: &[EmployeeId],
    ) -> Option<&Employee> {
        self.directory
            .approver_candidates_at_level(level)
            .into_iter()
            .find(|employee| employee.id != *submitter_id && !chain.contains(&employee.id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::budget::{BudgetTier, BudgetTierId};
    use crate::domain::employee::{Employee, EmployeeId, Role};

    use super::{BudgetTierTable, ChainResolver, OrgDirectory};

    fn employee(id: &str, level: u8, manager_id: Option<&str>, role: Role) -> Employee {
        let now = Utc::now();
        Employee {
            id: EmployeeId(id.to_string()),
            name: format!("Employee {id}"),
            email: format!("{id}@example.com"),
            role,
            level,
            manager_id: manager_id.map(|manager| EmployeeId(manager.to_string())),
            position: None,
            department: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tier(id: &str, min: i64, max: i64, levels: &[u8], is_active: bool) -> BudgetTier {
        let now = Utc::now();
        BudgetTier {
            id: BudgetTierId(id.to_string()),
            name: id.to_string(),
            min_amount: Decimal::new(min, 0),
            max_amount: Decimal::new(max, 0),
            approver_levels: levels.to_vec(),
            description: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// ceo(1) <- vp(2) <- mgr(3) <- staff(4); a second manager and vp exist
    /// outside the staff hierarchy, plus one admin.
    fn org() -> OrgDirectory {
        OrgDirectory::new(vec![
            employee("ceo", 1, None, Role::Standard),
            employee("vp-1", 2, Some("ceo"), Role::Standard),
            employee("vp-2", 2, Some("ceo"), Role::Standard),
            employee("mgr-1", 3, Some("vp-1"), Role::Standard),
            employee("mgr-2", 3, Some("vp-2"), Role::Standard),
            employee("staff-1", 4, Some("mgr-1"), Role::Standard),
            employee("staff-2", 4, Some("mgr-1"), Role::Standard),
            employee("it-admin", 1, None, Role::Admin),
        ])
    }

    fn id(raw: &str) -> EmployeeId {
        EmployeeId(raw.to_string())
    }

    fn ids(raw: &[&str]) -> Vec<EmployeeId> {
        raw.iter().map(|value| id(value)).collect()
    }

    #[test]
    fn single_level_tier_resolves_direct_manager() {
        // Scenario: one active tier [0,999] -> {3}, submitter's manager at 3.
        let resolver =
            ChainResolver::new(org(), BudgetTierTable::new(vec![tier("t1", 0, 999, &[3], true)]));

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(500, 0));
        assert_eq!(chain, ids(&["mgr-1"]));
    }

    #[test]
    fn multi_level_tier_walks_up_the_hierarchy_junior_first() {
        // Tier [1000,19999] -> {3,2}: manager first, then their manager.
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![tier("t1", 1_000, 19_999, &[2, 3], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(5_000, 0));
        assert_eq!(chain, ids(&["mgr-1", "vp-1"]));
    }

    #[test]
    fn no_matching_tier_falls_back_to_direct_manager_only() {
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![tier("t1", 10_000, 99_999, &[1, 2], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(50, 0));
        assert_eq!(chain, ids(&["mgr-1"]));
    }

    #[test]
    fn no_matching_tier_and_no_manager_yields_empty_chain() {
        let resolver = ChainResolver::new(org(), BudgetTierTable::new(Vec::new()));

        let chain = resolver.resolve_chain(&id("ceo"), Decimal::new(50, 0));
        assert!(chain.is_empty());
    }

    #[test]
    fn inactive_tiers_never_match() {
        let resolver =
            ChainResolver::new(org(), BudgetTierTable::new(vec![tier("t1", 0, 999, &[2], false)]));

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(500, 0));
        assert_eq!(chain, ids(&["mgr-1"]), "inactive tier should fall back to manager approval");
    }

    #[test]
    fn overlapping_active_tiers_resolve_to_lowest_min_amount_first() {
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![
                tier("t-wide", 0, 9_999, &[1], true),
                tier("t-low", 0, 999, &[3], true),
            ]),
        );

        // Both contain 500; the table orders by min_amount then id, so
        // `t-low` wins and routes to the level-3 manager.
        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(500, 0));
        assert_eq!(chain, ids(&["mgr-1"]));
    }

    #[test]
    fn unknown_submitter_resolves_to_empty_chain() {
        let resolver =
            ChainResolver::new(org(), BudgetTierTable::new(vec![tier("t1", 0, 999, &[3], true)]));

        let chain = resolver.resolve_chain(&id("ghost"), Decimal::new(500, 0));
        assert!(chain.is_empty());
    }

    #[test]
    fn hierarchy_miss_falls_back_to_any_employee_at_level() {
        // staff-1's hierarchy reaches levels 3, 2, 1 but the tier requires a
        // level that only exists outside it.
        let directory = OrgDirectory::new(vec![
            employee("ceo", 1, None, Role::Standard),
            employee("mgr-1", 3, Some("ceo"), Role::Standard),
            employee("staff-1", 4, Some("mgr-1"), Role::Standard),
            employee("vp-detached", 2, None, Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[2], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["vp-detached"]));
    }

    #[test]
    fn fallback_selection_is_deterministic_by_id() {
        let directory = OrgDirectory::new(vec![
            employee("staff-1", 4, None, Role::Standard),
            employee("peer-b", 2, None, Role::Standard),
            employee("peer-a", 2, None, Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[2], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["peer-a"]));
    }

    #[test]
    fn vacant_level_is_silently_skipped() {
        // Nobody sits at level 2 anywhere: the chain omits that level.
        let directory = OrgDirectory::new(vec![
            employee("ceo", 1, None, Role::Standard),
            employee("mgr-1", 3, Some("ceo"), Role::Standard),
            employee("staff-1", 4, Some("mgr-1"), Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 99_999, &[1, 2, 3], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["mgr-1", "ceo"]));
    }

    #[test]
    fn admins_never_appear_in_a_chain() {
        let directory = OrgDirectory::new(vec![
            employee("admin-boss", 2, None, Role::Admin),
            employee("staff-1", 4, Some("admin-boss"), Role::Standard),
            employee("vp-1", 2, None, Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[2], true)]),
        );

        // The admin manager terminates the hierarchy walk; the fallback picks
        // the non-admin at the required level instead.
        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["vp-1"]));
    }

    #[test]
    fn admin_manager_is_excluded_from_minimal_approval_fallback() {
        let directory = OrgDirectory::new(vec![
            employee("admin-boss", 2, None, Role::Admin),
            employee("staff-1", 4, Some("admin-boss"), Role::Standard),
        ]);
        let resolver = ChainResolver::new(directory, BudgetTierTable::new(Vec::new()));

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert!(chain.is_empty());
    }

    #[test]
    fn submitter_never_appears_in_their_own_chain() {
        // staff-1 is itself at a required level; the fallback must pass over
        // the submitter and pick a peer.
        let directory = OrgDirectory::new(vec![
            employee("staff-1", 4, None, Role::Standard),
            employee("staff-2", 4, None, Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[4], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["staff-2"]));
    }

    #[test]
    fn duplicate_nominations_keep_the_chain_deduplicated() {
        // Levels {3,3} configured twice and a hierarchy/fallback overlap must
        // not produce the same approver twice.
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[3, 3], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["mgr-1"]));
    }

    #[test]
    fn cyclic_manager_references_are_tolerated() {
        let directory = OrgDirectory::new(vec![
            employee("loop-a", 3, Some("loop-b"), Role::Standard),
            employee("loop-b", 3, Some("loop-a"), Role::Standard),
            employee("staff-1", 4, Some("loop-a"), Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[2, 3], true)]),
        );

        // The walk terminates despite the a<->b cycle; level 2 is vacant and
        // skipped, level 3 resolves through the hierarchy.
        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["loop-a"]));
    }

    #[test]
    fn dangling_manager_reference_degrades_to_fallback() {
        let directory = OrgDirectory::new(vec![
            employee("staff-1", 4, Some("departed"), Role::Standard),
            employee("vp-1", 2, None, Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 9_999, &[2], true)]),
        );

        let chain = resolver.resolve_chain(&id("staff-1"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["vp-1"]));
    }

    #[test]
    fn position_advances_so_later_levels_resolve_relative_to_prior_approver() {
        // staff-2 reports to mgr-1 under vp-1; after mgr-2 is picked via
        // fallback, the level-2 walk runs from mgr-2 and lands on vp-2.
        let directory = OrgDirectory::new(vec![
            employee("ceo", 1, None, Role::Standard),
            employee("vp-1", 2, Some("ceo"), Role::Standard),
            employee("vp-2", 2, Some("ceo"), Role::Standard),
            employee("mgr-2", 3, Some("vp-2"), Role::Standard),
            employee("staff-2", 4, Some("vp-1"), Role::Standard),
        ]);
        let resolver = ChainResolver::new(
            directory,
            BudgetTierTable::new(vec![tier("t1", 0, 99_999, &[3, 2], true)]),
        );

        // Level 3: staff-2's hierarchy (vp-1, ceo) has no level 3, so the
        // fallback nominates mgr-2. Level 2 then resolves from mgr-2 upward.
        let chain = resolver.resolve_chain(&id("staff-2"), Decimal::new(100, 0));
        assert_eq!(chain, ids(&["mgr-2", "vp-2"]));
    }

    #[test]
    fn resolution_is_deterministic_across_repeated_calls() {
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![tier("t1", 0, 99_999, &[1, 2, 3], true)]),
        );

        let first = resolver.resolve_chain(&id("staff-1"), Decimal::new(2_500, 0));
        let second = resolver.resolve_chain(&id("staff-1"), Decimal::new(2_500, 0));
        assert_eq!(first, second);
        assert_eq!(first, ids(&["mgr-1", "vp-1", "ceo"]));
    }

    #[test]
    fn preview_attaches_names_and_levels_in_chain_order() {
        let resolver = ChainResolver::new(
            org(),
            BudgetTierTable::new(vec![tier("t1", 0, 19_999, &[2, 3], true)]),
        );

        let preview = resolver.preview_chain(&id("staff-1"), Decimal::new(5_000, 0));
        let labels: Vec<(&str, u8)> =
            preview.iter().map(|stop| (stop.approver_id.0.as_str(), stop.level)).collect();
        assert_eq!(labels, vec![("mgr-1", 3), ("vp-1", 2)]);
        assert_eq!(preview[0].name, "Employee mgr-1");
    }
}
