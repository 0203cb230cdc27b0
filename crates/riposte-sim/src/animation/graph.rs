//! Deterministic reference animation graph.
//!
//! A single active clip with normalized time. Transitions are evaluated once
//! at the start of every advance, combat clips take precedence over
//! locomotion, and markers fire when playback crosses them. Non-looping clips
//! return to locomotion (or the in-air loop) when they finish.

use riposte_core::ids::ClipId;
use riposte_core::weapon::{ATTACK_IDS, PARRY_IDS, TAKE_DAMAGE_IDS};

use super::{AnimationEvent, AnimationPlayback, Param, ParamTable, SETTLE_DT};

/// What a clip represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    Locomotion,
    JumpStart,
    InAir,
    Land,
    Attack(i32),
    TakeDamage(i32),
    Parry(i32),
}

impl ClipKind {
    fn is_base(self) -> bool {
        matches!(
            self,
            ClipKind::Locomotion | ClipKind::JumpStart | ClipKind::InAir | ClipKind::Land
        )
    }
}

/// A clip definition: timing plus markers.
#[derive(Debug, Clone)]
pub struct ClipDef {
    pub id: ClipId,
    pub name: String,
    pub kind: ClipKind,
    /// Duration in seconds at normalized time 1.
    pub length: f32,
    pub looping: bool,
    /// `(normalized time, event)`, sorted by time. Markers at equal times
    /// fire in list order.
    pub markers: Vec<(f32, AnimationEvent)>,
}

impl ClipDef {
    fn new(name: &str, kind: ClipKind, length: f32, looping: bool) -> Self {
        Self {
            id: ClipId::from_name(name),
            name: name.to_owned(),
            kind,
            length,
            looping,
            markers: Vec::new(),
        }
    }

    fn with_markers(mut self, markers: &[(f32, AnimationEvent)]) -> Self {
        self.markers = markers.to_vec();
        self
    }
}

// ---------------------------------------------------------------------------
// ClipGraph
// ---------------------------------------------------------------------------

/// Reference [`AnimationPlayback`] with locomotion, attack, hit-reaction and
/// parry clips.
#[derive(Debug, Clone)]
pub struct ClipGraph {
    clips: Vec<ClipDef>,
    current: usize,
    time: f32,
}

const LOCOMOTION: &str = "Base.Locomotion";

impl Default for ClipGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipGraph {
    /// The standard graph, starting in locomotion.
    pub fn new() -> Self {
        use AnimationEvent::*;

        let light_with_combo: [(f32, AnimationEvent); 7] = [
            (0.10, EnableCanBeParried),
            (0.30, EnableMeleeDamage),
            (0.35, DisableCanBeParried),
            (0.45, DisableMeleeDamage),
            (0.45, ReachedDamageFrame),
            (0.50, EnableCombo),
            (0.80, DisableCombo),
        ];
        let light_finisher: [(f32, AnimationEvent); 5] = [
            (0.10, EnableCanBeParried),
            (0.30, EnableMeleeDamage),
            (0.35, DisableCanBeParried),
            (0.50, DisableMeleeDamage),
            (0.50, ReachedDamageFrame),
        ];
        let heavy: [(f32, AnimationEvent); 5] = [
            (0.10, EnableCanBeParried),
            (0.35, EnableMeleeDamage),
            (0.40, DisableCanBeParried),
            (0.55, DisableMeleeDamage),
            (0.55, ReachedDamageFrame),
        ];

        let clips = vec![
            ClipDef::new(LOCOMOTION, ClipKind::Locomotion, 1.0, true),
            ClipDef::new("Base.JumpStart", ClipKind::JumpStart, 0.35, false),
            ClipDef::new("Base.InAir", ClipKind::InAir, 1.0, true),
            ClipDef::new("Base.JumpLand", ClipKind::Land, 0.3, false),
            ClipDef::new("Combat.Attack101", ClipKind::Attack(101), 0.9, false)
                .with_markers(&light_with_combo),
            ClipDef::new("Combat.Attack102", ClipKind::Attack(102), 0.9, false)
                .with_markers(&light_with_combo),
            ClipDef::new("Combat.Attack103", ClipKind::Attack(103), 1.0, false)
                .with_markers(&light_finisher),
            ClipDef::new("Combat.Attack104", ClipKind::Attack(104), 1.4, false)
                .with_markers(&heavy),
            ClipDef::new("Combat.TakeDamage1", ClipKind::TakeDamage(1), 0.6, false),
            ClipDef::new("Combat.Parry51", ClipKind::Parry(51), 0.6, false),
            ClipDef::new("Combat.Parry52", ClipKind::Parry(52), 1.0, false),
        ];
        Self {
            clips,
            current: 0,
            time: 0.0,
        }
    }

    /// Id of the locomotion clip, the graph's entry state.
    pub fn locomotion_clip() -> ClipId {
        ClipId::from_name(LOCOMOTION)
    }

    /// Id of the clip playing `kind`, if the graph has one.
    pub fn clip_for(&self, kind: ClipKind) -> Option<ClipId> {
        self.index_of(kind).map(|i| self.clips[i].id)
    }

    /// Definition of the active clip.
    pub fn active(&self) -> &ClipDef {
        &self.clips[self.current]
    }

    fn index_of(&self, kind: ClipKind) -> Option<usize> {
        self.clips.iter().position(|c| c.kind == kind)
    }

    fn index_of_id(&self, clip: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == clip)
    }

    /// The combat clip the parameters ask for, if any.
    fn requested_combat(&self, params: &ParamTable) -> Option<ClipKind> {
        let take_damage_id = params.id(Param::TakeDamageId);
        if params.flag(Param::TakingDamage) && TAKE_DAMAGE_IDS.contains(&take_damage_id) {
            return Some(ClipKind::TakeDamage(take_damage_id));
        }
        let parry_id = params.id(Param::ParryId);
        if PARRY_IDS.contains(&parry_id) {
            return Some(ClipKind::Parry(parry_id));
        }
        let attack_id = params.id(Param::AttackId);
        if params.flag(Param::Attacking) && ATTACK_IDS.contains(&attack_id) {
            return Some(ClipKind::Attack(attack_id));
        }
        None
    }

    fn base_transition(&self, params: &ParamTable) -> Option<ClipKind> {
        let grounded = params.flag(Param::Grounded);
        match self.active().kind {
            ClipKind::Locomotion | ClipKind::Land if params.flag(Param::Jump) => {
                Some(ClipKind::JumpStart)
            }
            ClipKind::Locomotion if params.flag(Param::FreeFall) && !grounded => Some(ClipKind::InAir),
            ClipKind::InAir if grounded => Some(ClipKind::Land),
            _ => None,
        }
    }

    fn next_clip(&self, params: &ParamTable) -> Option<ClipKind> {
        let current = self.active().kind;
        match self.requested_combat(params) {
            Some(kind) if kind != current => Some(kind),
            Some(_) => None,
            None if current.is_base() => self.base_transition(params),
            None => None,
        }
    }

    fn default_clip(params: &ParamTable) -> ClipKind {
        if params.flag(Param::Grounded) {
            ClipKind::Locomotion
        } else {
            ClipKind::InAir
        }
    }

    /// Switch to `kind` at time zero, raising boundary events.
    fn enter(&mut self, kind: ClipKind, events: &mut Vec<AnimationEvent>) {
        let Some(index) = self.index_of(kind) else {
            tracing::warn!(?kind, "clip not present in graph");
            return;
        };
        let from = self.active().kind;

        match (from, kind) {
            (ClipKind::Attack(_), ClipKind::Attack(_)) => {}
            (ClipKind::Attack(_), ClipKind::TakeDamage(_) | ClipKind::Parry(_)) => {
                events.push(AnimationEvent::Interrupted);
                events.push(AnimationEvent::AttackExited);
            }
            (ClipKind::Attack(_), _) => events.push(AnimationEvent::AttackExited),
            (ClipKind::TakeDamage(_), _) => events.push(AnimationEvent::TakeDamageExited),
            (ClipKind::Parry(_), ClipKind::Parry(_)) => {}
            (ClipKind::Parry(_), _) => events.push(AnimationEvent::ParryExited),
            _ => {}
        }
        if matches!(kind, ClipKind::Attack(_)) {
            events.push(AnimationEvent::AttackEntered);
        }

        tracing::trace!(from = ?from, to = ?kind, "clip transition");
        self.current = index;
        self.time = 0.0;
    }
}

impl AnimationPlayback for ClipGraph {
    fn advance(&mut self, dt: f32, params: &ParamTable) -> Vec<AnimationEvent> {
        let mut events = Vec::new();
        if dt < SETTLE_DT * 10.0 {
            return events;
        }

        if let Some(next) = self.next_clip(params) {
            self.enter(next, &mut events);
        }

        let clip = &self.clips[self.current];
        let from = self.time;
        let to = from + dt / clip.length;
        events.extend(
            clip.markers
                .iter()
                .filter(|(at, _)| *at > from && *at <= to)
                .map(|(_, event)| *event),
        );

        if clip.looping {
            self.time = to - to.floor();
        } else if to >= 1.0 {
            let next = match clip.kind {
                ClipKind::JumpStart if !params.flag(Param::Grounded) => ClipKind::InAir,
                ClipKind::JumpStart => ClipKind::Land,
                _ => Self::default_clip(params),
            };
            self.enter(next, &mut events);
        } else {
            self.time = to;
        }
        events
    }

    fn play(&mut self, clip: ClipId, normalized_time: f32) {
        let index = if clip == ClipId::NONE {
            0
        } else if let Some(index) = self.index_of_id(clip) {
            index
        } else {
            tracing::warn!(?clip, "unknown clip, falling back to locomotion");
            0
        };
        self.current = index;
        self.time = normalized_time;
    }

    fn active_clip(&self) -> ClipId {
        self.active().id
    }

    fn normalized_time(&self) -> f32 {
        self.time
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ParamValue;

    const DT: f32 = 1.0 / 60.0;

    fn params(entries: &[(Param, ParamValue)]) -> ParamTable {
        let mut table = ParamTable::standard();
        table.set(Param::Grounded, ParamValue::Bool(true)).unwrap();
        for (param, value) in entries {
            table.set(*param, *value).unwrap();
        }
        table
    }

    #[test]
    fn clip_ids_are_unique() {
        let graph = ClipGraph::new();
        let mut ids: Vec<_> = graph.clips.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), graph.clips.len());
    }

    #[test]
    fn settle_advance_runs_no_transitions() {
        let mut graph = ClipGraph::new();
        let table = params(&[(Param::Attacking, ParamValue::Bool(true)), (Param::AttackId, ParamValue::Int(101))]);
        assert!(graph.advance(SETTLE_DT, &table).is_empty());
        assert_eq!(graph.active_clip(), ClipGraph::locomotion_clip());
        assert_eq!(graph.normalized_time(), 0.0);
    }

    #[test]
    fn attack_request_enters_attack_clip() {
        let mut graph = ClipGraph::new();
        let table = params(&[(Param::Attacking, ParamValue::Bool(true)), (Param::AttackId, ParamValue::Int(104))]);
        let events = graph.advance(DT, &table);
        assert_eq!(events, vec![AnimationEvent::AttackEntered]);
        assert_eq!(graph.active().kind, ClipKind::Attack(104));
    }

    #[test]
    fn jump_goes_through_air_and_lands() {
        let mut graph = ClipGraph::new();
        let jumping = params(&[(Param::Jump, ParamValue::Bool(true))]);
        graph.advance(DT, &jumping);
        assert_eq!(graph.active().kind, ClipKind::JumpStart);

        let airborne = {
            let mut t = ParamTable::standard();
            t.set(Param::Jump, ParamValue::Bool(true)).unwrap();
            t
        };
        for _ in 0..30 {
            graph.advance(DT, &airborne);
        }
        assert_eq!(graph.active().kind, ClipKind::InAir);

        graph.advance(DT, &params(&[]));
        assert_eq!(graph.active().kind, ClipKind::Land);
        for _ in 0..30 {
            graph.advance(DT, &params(&[]));
        }
        assert_eq!(graph.active().kind, ClipKind::Locomotion);
    }

    #[test]
    fn markers_fire_once_per_play() {
        let mut graph = ClipGraph::new();
        let table = params(&[(Param::Attacking, ParamValue::Bool(true)), (Param::AttackId, ParamValue::Int(101))]);
        let mut frames = 0;
        for _ in 0..60 {
            frames += graph
                .advance(DT, &table)
                .iter()
                .filter(|e| **e == AnimationEvent::ReachedDamageFrame)
                .count();
            if graph.active().kind != ClipKind::Attack(101) {
                break;
            }
        }
        assert_eq!(frames, 1);
    }

    #[test]
    fn unknown_clip_falls_back_to_locomotion() {
        let mut graph = ClipGraph::new();
        graph.play(ClipId(12345), 0.5);
        assert_eq!(graph.active_clip(), ClipGraph::locomotion_clip());
        assert_eq!(graph.normalized_time(), 0.5);
    }
}
