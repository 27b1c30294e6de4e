use engine::{pick_nearest, Camera3D};
use tracing::{info, warn};

use super::assembly::PickableSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Armed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    Armed,
    AlreadyArmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identified {
    pub name: String,
    pub distance: f32,
}

/// Resolves a click to the entity under the view centre.
///
/// Only [`InteractionGate::arm`] creates one, so a pick before arming has
/// no handler to run.
#[derive(Debug)]
pub struct PickHandler {
    _installed: (),
}

impl PickHandler {
    pub fn identify(&self, camera: &Camera3D, pickables: &PickableSet) -> Option<Identified> {
        let ray = camera.center_ray();
        let hit = pick_nearest(&ray, pickables.candidates())?;
        let pickable = pickables.get(hit.key)?;
        let name = pickable
            .mesh_names
            .first()
            .cloned()
            .unwrap_or_else(|| pickable.name.clone());
        info!(
            name = %name,
            slot = pickable.slot,
            distance = hit.distance,
            "entity_identified"
        );
        Some(Identified {
            name,
            distance: hit.distance,
        })
    }
}

#[derive(Debug)]
pub struct InteractionGate {
    state: GateState,
    handler: Option<PickHandler>,
    handler_installs: u32,
}

impl Default for InteractionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
            handler: None,
            handler_installs: 0,
        }
    }

    /// `Idle -> Armed`; installs the pick handler on the first call only.
    pub fn arm(&mut self) -> ArmOutcome {
        match self.state {
            GateState::Armed => {
                warn!("interaction_gate_rearm_ignored");
                ArmOutcome::AlreadyArmed
            }
            GateState::Idle => {
                self.state = GateState::Armed;
                self.handler = Some(PickHandler { _installed: () });
                self.handler_installs += 1;
                info!("interaction_gate_armed");
                ArmOutcome::Armed
            }
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn handler(&self) -> Option<&PickHandler> {
        self.handler.as_ref()
    }

    pub fn handler_installs(&self) -> u32 {
        self.handler_installs
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::app::forest::assembly::Pickable;

    fn pickables(entries: &[(&str, Vec3)]) -> PickableSet {
        let mut set = PickableSet::default();
        for (slot, (name, center)) in entries.iter().enumerate() {
            set.insert(Pickable {
                slot,
                name: name.to_string(),
                mesh_names: vec![name.to_string()],
                center: *center,
                radius: 0.5,
            });
        }
        set
    }

    fn camera_aimed_at(target: Vec3) -> Camera3D {
        let mut camera = Camera3D::default();
        camera.look_at(target);
        camera
    }

    #[test]
    fn arming_installs_handler_exactly_once() {
        let mut gate = InteractionGate::new();
        assert!(gate.handler().is_none());
        assert_eq!(gate.arm(), ArmOutcome::Armed);
        assert_eq!(gate.arm(), ArmOutcome::AlreadyArmed);
        assert_eq!(gate.state(), GateState::Armed);
        assert_eq!(gate.handler_installs(), 1);
    }

    #[test]
    fn ray_at_b_identifies_b_and_empty_space_identifies_nothing() {
        let set = pickables(&[
            ("A", Vec3::new(-4.0, 0.0, -6.0)),
            ("B", Vec3::new(0.0, 2.0, -8.0)),
            ("C", Vec3::new(5.0, -1.0, -3.0)),
        ]);
        let mut gate = InteractionGate::new();
        gate.arm();
        let handler = gate.handler().expect("armed");

        let hit = handler
            .identify(&camera_aimed_at(Vec3::new(0.0, 2.0, -8.0)), &set)
            .expect("hit B");
        assert_eq!(hit.name, "B");

        assert!(handler
            .identify(&camera_aimed_at(Vec3::new(0.0, 20.0, 10.0)), &set)
            .is_none());
    }

    #[test]
    fn every_click_after_arming_is_resolved_independently() {
        let set = pickables(&[("A", Vec3::new(0.0, 0.0, -5.0)), ("B", Vec3::new(5.0, 0.0, 0.0))]);
        let mut gate = InteractionGate::new();
        gate.arm();
        let handler = gate.handler().expect("armed");

        let first = handler.identify(&camera_aimed_at(Vec3::new(0.0, 0.0, -5.0)), &set);
        let second = handler.identify(&camera_aimed_at(Vec3::new(5.0, 0.0, 0.0)), &set);
        let third = handler.identify(&camera_aimed_at(Vec3::new(0.0, 0.0, -5.0)), &set);
        assert_eq!(first.map(|hit| hit.name), Some("A".to_string()));
        assert_eq!(second.map(|hit| hit.name), Some("B".to_string()));
        assert_eq!(third.map(|hit| hit.name), Some("A".to_string()));
    }
}
