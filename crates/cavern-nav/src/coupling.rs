//! Coupling of navigations into groups that move together.
//!
//! The relation is kept as an explicit adjacency set. [`CouplingGraph::couple`]
//! merges the two groups completely, so after any sequence of `couple` and
//! `clear_couplings` calls every member of a group is directly linked to every
//! other member. [`CouplingGraph::decouple`] removes exactly one edge.
//!
//! Triggering a coupling can start a convergence animation: every member
//! slides toward the nearest partner (the anchor) while its integrator is
//! blocked. A group is released in one step once none of its members is
//! still animating.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use cavern_core::math::{align_hemisphere, compose_pose, quat_distance, rotation_of, slerp, translation_of};
use cavern_core::{NavId, NavigationMode, MIN_ANIMATION_TIME};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::integrator::MotionDelta;
use crate::navigation::{Navigation, NavigationSet};

/// Convergence of one navigation toward its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingAnimation {
    /// Navigation being converged to.
    pub partner: NavId,
    /// Platform translation at start.
    pub start_pos: Vector3<f64>,
    /// Platform rotation at start.
    pub start_rot: UnitQuaternion<f64>,
    /// Platform translation that puts the device pivot on the partner's.
    pub target_pos: Vector3<f64>,
    /// Partner rotation, in the hemisphere of `start_rot`.
    pub target_rot: UnitQuaternion<f64>,
    /// Partner device pivot at start.
    pub partner_pivot_start: Vector3<f64>,
    /// Start time (seconds).
    pub start_time: f64,
    /// Duration (seconds).
    pub duration: f64,
}

impl CouplingAnimation {
    /// Progress in `[0, 1]` at `now`.
    #[must_use]
    pub fn ratio(&self, now: f64) -> f64 {
        ((now - self.start_time) / self.duration).clamp(0.0, 1.0)
    }

    /// Platform translation and rotation at `now`, following the partner's
    /// horizontal drift.
    #[must_use]
    pub fn pose_at(&self, now: f64, partner_pivot: &Vector3<f64>) -> (Vector3<f64>, UnitQuaternion<f64>) {
        let mut drift = partner_pivot - self.partner_pivot_start;
        drift.y = 0.0;
        let ratio = self.ratio(now);
        let position = self.start_pos.lerp(&(self.target_pos + drift), ratio);
        (position, slerp(&self.start_rot, &self.target_rot, ratio))
    }
}

/// Result of a coupling trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The navigation joined a group with these members.
    Coupled(Vec<NavId>),
    /// The navigation was already coupled and left its group.
    Decoupled(Vec<NavId>),
    /// No navigation in range with a matching scale.
    NoCandidates,
}

/// Symmetric coupled-with relation plus running convergence animations.
#[derive(Clone, Debug, Default)]
pub struct CouplingGraph {
    edges: BTreeMap<NavId, BTreeSet<NavId>>,
    animations: BTreeMap<NavId, CouplingAnimation>,
    held: BTreeSet<NavId>,
}

impl CouplingGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct partners of a navigation.
    pub fn partners(&self, id: NavId) -> impl Iterator<Item = NavId> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    /// Whether the navigation has any partner.
    #[must_use]
    pub fn is_coupled(&self, id: NavId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Whether two navigations are directly linked.
    #[must_use]
    pub fn are_linked(&self, a: NavId, b: NavId) -> bool {
        self.edges.get(&a).is_some_and(|s| s.contains(&b)) || self.edges.get(&b).is_some_and(|s| s.contains(&a))
    }

    /// Connected component of `id`, including `id`, in handle order.
    #[must_use]
    pub fn group(&self, id: NavId) -> Vec<NavId> {
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for partner in self.partners(current) {
                if seen.insert(partner) {
                    queue.push_back(partner);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// The running convergence animation of a navigation.
    #[must_use]
    pub fn animation(&self, id: NavId) -> Option<&CouplingAnimation> {
        self.animations.get(&id)
    }

    /// Whether the navigation is converging.
    #[must_use]
    pub fn in_coupling_animation(&self, id: NavId) -> bool {
        self.animations.contains_key(&id)
    }

    /// Whether the navigation is blocked by a coupling animation of its group.
    #[must_use]
    pub fn is_held(&self, id: NavId) -> bool {
        self.held.contains(&id)
    }

    /// Link two navigations and merge their groups.
    ///
    /// Self-coupling, coupling an already linked pair and unknown handles are
    /// no-ops. If any member of the merged group is unrealistic, the whole
    /// group switches to unrealistic. If any member is converging, the whole
    /// group is held until it is released. Returns whether anything changed.
    pub fn couple(&mut self, navigations: &mut NavigationSet, a: NavId, b: NavId) -> bool {
        if a == b || self.are_linked(a, b) || !navigations.contains(a) || !navigations.contains(b) {
            return false;
        }

        let members: BTreeSet<NavId> = self.group(a).into_iter().chain(self.group(b)).collect();
        for &x in &members {
            for &y in &members {
                if x != y {
                    self.edges.entry(x).or_default().insert(y);
                }
            }
        }
        debug_assert!(self.is_symmetric());

        // A group that is still converging holds newcomers until it settles
        if members.iter().any(|m| self.animations.contains_key(m)) {
            for &m in &members {
                if let Some(nav) = navigations.get_mut(m) {
                    nav.integrator_mut().set_blocked(true);
                }
                self.held.insert(m);
            }
        }

        let free_flight = members
            .iter()
            .filter_map(|&m| navigations.get(m))
            .any(|n| n.mode() == NavigationMode::Unrealistic);
        if free_flight {
            for &m in &members {
                if let Some(nav) = navigations.get_mut(m) {
                    if nav.mode().is_realistic() || nav.integrator().in_dofchange_animation() {
                        nav.integrator_mut().activate_unrealistic_mode();
                    }
                }
            }
        }

        info!(members = ?members, "navigations coupled");
        true
    }

    /// Remove the single edge between two navigations.
    pub fn decouple(&mut self, a: NavId, b: NavId) -> bool {
        let removed = self.unlink(a, b) | self.unlink(b, a);
        if removed {
            info!(a = %a, b = %b, "navigations decoupled");
        }
        removed
    }

    /// Remove every edge of a navigation.
    ///
    /// Its own convergence animation is cancelled and it is unblocked at
    /// once. Former members converging toward a navigation that is no longer
    /// in their group stop where they are; the rest of the former group is
    /// released as soon as none of them is animating. Returns the former
    /// group.
    pub fn clear_couplings(&mut self, navigations: &mut NavigationSet, id: NavId) -> Vec<NavId> {
        let members = self.group(id);

        if let Some(partners) = self.edges.remove(&id) {
            for partner in partners {
                self.unlink(partner, id);
            }
        }
        if self.animations.remove(&id).is_some() {
            debug!(navigation = %id, "coupling animation cancelled");
        }
        if self.held.remove(&id) {
            if let Some(nav) = navigations.get_mut(id) {
                nav.integrator_mut().set_blocked(false);
            }
        }

        let orphaned: Vec<NavId> = members
            .iter()
            .copied()
            .filter(|&m| {
                self.animations
                    .get(&m)
                    .is_some_and(|a| a.partner != m && !self.group(m).contains(&a.partner))
            })
            .collect();
        for member in orphaned {
            self.animations.remove(&member);
            debug!(navigation = %member, "coupling animation lost its anchor");
        }
        self.release(navigations);

        if members.len() > 1 {
            info!(navigation = %id, members = ?members, "navigation left its coupling group");
        }
        members
    }

    /// Coupling toggle.
    ///
    /// A coupled navigation leaves its group. Otherwise every navigation
    /// within `coupling_distance` of its device point and with exactly the
    /// same scale is coupled to it, farthest first. With animation enabled
    /// the whole group converges toward the nearest candidate.
    pub fn trigger_coupling(
        &mut self,
        navigations: &mut NavigationSet,
        id: NavId,
        now: f64,
        settings: &EngineSettings,
    ) -> TriggerOutcome {
        if self.is_coupled(id) {
            return TriggerOutcome::Decoupled(self.clear_couplings(navigations, id));
        }

        let candidates = Self::candidates(navigations, id, settings.coupling_distance);
        let Some(&anchor) = candidates.last() else {
            debug!(navigation = %id, "no coupling candidates in range");
            return TriggerOutcome::NoCandidates;
        };

        for &candidate in &candidates {
            self.couple(navigations, id, candidate);
        }
        let members = self.group(id);

        if settings.animate_coupling {
            self.start_animations(navigations, &members, anchor, now);
        }
        TriggerOutcome::Coupled(members)
    }

    /// Navigations in range with the same scale, sorted by descending distance.
    fn candidates(navigations: &NavigationSet, id: NavId, max_distance: f64) -> Vec<NavId> {
        let Some(origin) = navigations.get(id) else {
            return Vec::new();
        };
        let point = origin.device_world_position();

        #[allow(clippy::float_cmp)]
        let mut in_range: Vec<(f64, NavId)> = navigations
            .iter()
            .filter(|n| n.id() != id && n.scale() == origin.scale())
            .map(|n| ((n.device_world_position() - point).norm(), n.id()))
            .filter(|(distance, _)| *distance < max_distance)
            .collect();
        in_range.sort_by(|a, b| b.0.total_cmp(&a.0));
        in_range.into_iter().map(|(_, n)| n).collect()
    }

    fn start_animations(&mut self, navigations: &mut NavigationSet, members: &[NavId], anchor: NavId, now: f64) {
        let Some((anchor_pivot, anchor_rot)) = navigations
            .get(anchor)
            .map(|n| (n.device_world_position(), rotation_of(n.matrix())))
        else {
            return;
        };

        for &member in members {
            let Some(nav) = navigations.get_mut(member) else {
                continue;
            };
            let start_pos = translation_of(nav.matrix());
            let start_rot = rotation_of(nav.matrix());
            let mut offset = anchor_pivot - nav.device_world_position();
            offset.y = 0.0;
            let target_rot = align_hemisphere(&start_rot, &anchor_rot);
            let duration = (offset.norm() + quat_distance(&start_rot, &target_rot)).max(MIN_ANIMATION_TIME);

            self.animations.insert(
                member,
                CouplingAnimation {
                    partner: anchor,
                    start_pos,
                    start_rot,
                    target_pos: start_pos + offset,
                    target_rot,
                    partner_pivot_start: anchor_pivot,
                    start_time: now,
                    duration,
                },
            );
            nav.integrator_mut().set_blocked(true);
            self.held.insert(member);
            debug!(navigation = %member, anchor = %anchor, duration, "coupling animation started");
        }
    }

    /// Advance every convergence animation and release finished groups.
    ///
    /// Returns the navigations unblocked in this step.
    pub fn step(&mut self, navigations: &mut NavigationSet, now: f64) -> Vec<NavId> {
        let running: Vec<(NavId, CouplingAnimation)> = self.animations.iter().map(|(&id, &a)| (id, a)).collect();

        for (id, animation) in running {
            let partner_pivot = navigations
                .get(animation.partner)
                .map_or(animation.partner_pivot_start, Navigation::device_world_position);
            let Some(nav) = navigations.get_mut(id) else {
                self.animations.remove(&id);
                continue;
            };

            let (position, rotation) = animation.pose_at(now, &partner_pivot);
            nav.integrator_mut().set_abs_mat(compose_pose(&position, &rotation));

            if animation.ratio(now) >= 1.0 {
                self.animations.remove(&id);
                debug!(navigation = %id, "coupling animation finished");
            }
        }

        self.release(navigations)
    }

    /// Unblock every held group without a running animation.
    fn release(&mut self, navigations: &mut NavigationSet) -> Vec<NavId> {
        let mut released = Vec::new();
        let held: Vec<NavId> = self.held.iter().copied().collect();

        for id in held {
            if !self.held.contains(&id) {
                continue;
            }
            let group = self.group(id);
            if group.iter().any(|m| self.animations.contains_key(m)) {
                continue;
            }
            for member in group {
                if self.held.remove(&member) {
                    if let Some(nav) = navigations.get_mut(member) {
                        nav.integrator_mut().set_blocked(false);
                    }
                    released.push(member);
                }
            }
        }

        if !released.is_empty() {
            debug!(members = ?released, "coupling group unblocked");
        }
        released
    }

    /// Replay each mover's motion on its partners.
    ///
    /// Blocked partners and partners in a mode-change animation are skipped.
    pub fn propagate(&self, navigations: &mut NavigationSet, deltas: &[(NavId, MotionDelta)]) {
        for (source, delta) in deltas {
            for partner in self.partners(*source) {
                let Some(nav) = navigations.get_mut(partner) else {
                    continue;
                };
                if nav.is_blocked() || nav.integrator().in_dofchange_animation() {
                    continue;
                }
                nav.integrator_mut().apply_external(delta);
            }
        }
    }

    /// Request a mode on a navigation and its whole group.
    pub fn propagate_mode(&self, navigations: &mut NavigationSet, id: NavId, mode: NavigationMode, now: f64) -> Vec<NavId> {
        let members = self.group(id);
        for &member in &members {
            if let Some(nav) = navigations.get_mut(member) {
                nav.integrator_mut().set_mode(mode, now);
            }
        }
        members
    }

    fn unlink(&mut self, from: NavId, to: NavId) -> bool {
        let Some(set) = self.edges.get_mut(&from) else {
            return false;
        };
        let removed = set.remove(&to);
        if set.is_empty() {
            self.edges.remove(&from);
        }
        removed
    }

    fn is_symmetric(&self) -> bool {
        self.edges
            .iter()
            .all(|(a, set)| set.iter().all(|b| self.edges.get(b).is_some_and(|s| s.contains(a))))
    }
}
