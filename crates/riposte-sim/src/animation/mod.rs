//! Parameterized animation state machine, advanced once per tick.
//!
//! The animation layer is split in two:
//!
//! - [`AnimationStep`] owns the typed [`ParamTable`]: locomotion signals,
//!   combat flags and ids. It is the only writer of parameters, and it turns
//!   [`AnimationEvent`]s raised by the playback into parameter effects.
//! - An [`AnimationPlayback`] implementation owns clip selection and timing.
//!   It reads parameters but never writes them. [`ClipGraph`] is the
//!   deterministic implementation used by every headless participant.
//!
//! Clip markers (damage window, combo window, parry window) are what gate
//! combat. Attack resolution and damage aggregation therefore read the
//! parameters *after* this step has run for the tick.

mod graph;

pub use graph::{ClipDef, ClipGraph, ClipKind};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use riposte_core::ids::ClipId;
use riposte_core::state::{AnimationParams, AnimationState};
use riposte_core::weapon::{ATTACK_IDS, PARRY_IDS, TAKE_DAMAGE_IDS};

use crate::ParamError;

/// Advance used to re-sample the pose after a forced state, instead of a full
/// tick. Advances shorter than ten times this value never run transitions.
pub const SETTLE_DT: f32 = 1e-9;

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

/// Every animation parameter the graph understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Param {
    Speed,
    MotionSpeed,
    Grounded,
    Jump,
    FreeFall,
    Attacking,
    AttackId,
    TakingDamage,
    TakeDamageId,
    Parrying,
    ParryId,
    CanBeParried,
    CanCombo,
    ComboWindowClosed,
    CanDealMeleeDamage,
}

impl Param {
    /// All parameters, in declaration order.
    pub const ALL: [Param; 15] = [
        Param::Speed,
        Param::MotionSpeed,
        Param::Grounded,
        Param::Jump,
        Param::FreeFall,
        Param::Attacking,
        Param::AttackId,
        Param::TakingDamage,
        Param::TakeDamageId,
        Param::Parrying,
        Param::ParryId,
        Param::CanBeParried,
        Param::CanCombo,
        Param::ComboWindowClosed,
        Param::CanDealMeleeDamage,
    ];

    /// The kind this parameter is registered with in a standard table.
    pub fn kind(self) -> ParamKind {
        match self {
            Param::Speed | Param::MotionSpeed => ParamKind::Float,
            Param::AttackId | Param::TakeDamageId | Param::ParryId => ParamKind::Int,
            _ => ParamKind::Bool,
        }
    }
}

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => f.write_str("bool"),
            ParamKind::Int => f.write_str("int"),
            ParamKind::Float => f.write_str("float"),
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl ParamValue {
    /// The kind of this value.
    pub fn kind(self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
        }
    }

    fn zero(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
            ParamKind::Float => ParamValue::Float(0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// ParamTable
// ---------------------------------------------------------------------------

/// Typed parameter storage. Each parameter is registered once with a kind;
/// afterwards only values of that kind are accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    slots: BTreeMap<Param, ParamValue>,
}

impl ParamTable {
    /// An empty table with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with every [`Param`] registered at its standard kind and zero.
    pub fn standard() -> Self {
        let slots = Param::ALL
            .iter()
            .map(|p| (*p, ParamValue::zero(p.kind())))
            .collect();
        Self { slots }
    }

    /// Register `param` with `kind`, initialized to zero.
    pub fn register(&mut self, param: Param, kind: ParamKind) -> Result<(), ParamError> {
        if self.slots.contains_key(&param) {
            return Err(ParamError::AlreadyRegistered { param });
        }
        self.slots.insert(param, ParamValue::zero(kind));
        Ok(())
    }

    /// Write a value. Returns whether the stored value changed; writing an
    /// equal value is a no-op.
    pub fn set(&mut self, param: Param, value: ParamValue) -> Result<bool, ParamError> {
        let slot = self
            .slots
            .get_mut(&param)
            .ok_or(ParamError::NotRegistered { param })?;
        if slot.kind() != value.kind() {
            return Err(ParamError::KindMismatch {
                param,
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    /// Read a value.
    pub fn get(&self, param: Param) -> Result<ParamValue, ParamError> {
        self.slots
            .get(&param)
            .copied()
            .ok_or(ParamError::NotRegistered { param })
    }

    /// Read a bool parameter.
    pub fn bool(&self, param: Param) -> Result<bool, ParamError> {
        match self.get(param)? {
            ParamValue::Bool(v) => Ok(v),
            other => Err(ParamError::KindMismatch {
                param,
                expected: ParamKind::Bool,
                found: other.kind(),
            }),
        }
    }

    /// Read an int parameter.
    pub fn int(&self, param: Param) -> Result<i32, ParamError> {
        match self.get(param)? {
            ParamValue::Int(v) => Ok(v),
            other => Err(ParamError::KindMismatch {
                param,
                expected: ParamKind::Int,
                found: other.kind(),
            }),
        }
    }

    /// Read a float parameter.
    pub fn float(&self, param: Param) -> Result<f32, ParamError> {
        match self.get(param)? {
            ParamValue::Float(v) => Ok(v),
            other => Err(ParamError::KindMismatch {
                param,
                expected: ParamKind::Float,
                found: other.kind(),
            }),
        }
    }

    /// Bool read that treats missing or mistyped parameters as `false`.
    pub fn flag(&self, param: Param) -> bool {
        self.bool(param).unwrap_or(false)
    }

    /// Int read that treats missing or mistyped parameters as `0`.
    pub fn id(&self, param: Param) -> i32 {
        self.int(param).unwrap_or(0)
    }

    /// The serializable image of the table.
    pub fn to_params(&self) -> AnimationParams {
        AnimationParams {
            speed: self.float(Param::Speed).unwrap_or(0.0),
            motion_speed: self.float(Param::MotionSpeed).unwrap_or(0.0),
            grounded: self.flag(Param::Grounded),
            jump: self.flag(Param::Jump),
            free_fall: self.flag(Param::FreeFall),
            attacking: self.flag(Param::Attacking),
            attack_id: self.id(Param::AttackId),
            taking_damage: self.flag(Param::TakingDamage),
            take_damage_id: self.id(Param::TakeDamageId),
            parrying: self.flag(Param::Parrying),
            parry_id: self.id(Param::ParryId),
            can_be_parried: self.flag(Param::CanBeParried),
            can_combo: self.flag(Param::CanCombo),
            combo_window_closed: self.flag(Param::ComboWindowClosed),
            can_deal_melee_damage: self.flag(Param::CanDealMeleeDamage),
        }
    }

    /// Every parameter of `params` as `(param, value)` pairs.
    fn entries_of(params: &AnimationParams) -> [(Param, ParamValue); 15] {
        use ParamValue::{Bool, Float, Int};
        [
            (Param::Speed, Float(params.speed)),
            (Param::MotionSpeed, Float(params.motion_speed)),
            (Param::Grounded, Bool(params.grounded)),
            (Param::Jump, Bool(params.jump)),
            (Param::FreeFall, Bool(params.free_fall)),
            (Param::Attacking, Bool(params.attacking)),
            (Param::AttackId, Int(params.attack_id)),
            (Param::TakingDamage, Bool(params.taking_damage)),
            (Param::TakeDamageId, Int(params.take_damage_id)),
            (Param::Parrying, Bool(params.parrying)),
            (Param::ParryId, Int(params.parry_id)),
            (Param::CanBeParried, Bool(params.can_be_parried)),
            (Param::CanCombo, Bool(params.can_combo)),
            (Param::ComboWindowClosed, Bool(params.combo_window_closed)),
            (Param::CanDealMeleeDamage, Bool(params.can_deal_melee_damage)),
        ]
    }
}

// ---------------------------------------------------------------------------
// AnimationEvent
// ---------------------------------------------------------------------------

/// Signals raised by the playback while advancing: clip markers and
/// clip-boundary notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationEvent {
    EnableCanBeParried,
    DisableCanBeParried,
    EnableMeleeDamage,
    DisableMeleeDamage,
    /// The damage frame of the current attack: pending hits are committed.
    ReachedDamageFrame,
    EnableCombo,
    DisableCombo,
    /// A hit reaction or parry cut an attack short: pending hits are dropped.
    Interrupted,
    AttackEntered,
    AttackExited,
    TakeDamageExited,
    ParryExited,
}

impl AnimationEvent {
    /// Whether the damage aggregator consumes this event.
    pub fn is_damage_signal(self) -> bool {
        matches!(self, AnimationEvent::ReachedDamageFrame | AnimationEvent::Interrupted)
    }
}

// ---------------------------------------------------------------------------
// AnimationPlayback
// ---------------------------------------------------------------------------

/// Clip selection and playback. Implementations must be deterministic
/// functions of their inputs.
pub trait AnimationPlayback {
    /// Advance by `dt` seconds, evaluating transitions against `params`.
    fn advance(&mut self, dt: f32, params: &ParamTable) -> Vec<AnimationEvent>;

    /// Jump to `clip` at `normalized_time` without raising events.
    fn play(&mut self, clip: ClipId, normalized_time: f32);

    /// The clip currently playing.
    fn active_clip(&self) -> ClipId;

    /// Normalized time within the active clip.
    fn normalized_time(&self) -> f32;
}

// ---------------------------------------------------------------------------
// AnimationStep
// ---------------------------------------------------------------------------

/// Locomotion values written into the table at the start of each tick.
/// `None` leaves a trigger-like flag unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocomotionSignals {
    pub speed: f32,
    pub motion_speed: f32,
    pub grounded: bool,
    pub jump: Option<bool>,
    pub free_fall: Option<bool>,
}

/// Per-entity animation driver: parameter table plus playback.
pub struct AnimationStep {
    playback: Box<dyn AnimationPlayback>,
    params: ParamTable,
}

impl AnimationStep {
    /// Drive `playback` with a standard parameter table.
    pub fn new(playback: Box<dyn AnimationPlayback>) -> Self {
        Self {
            playback,
            params: ParamTable::standard(),
        }
    }

    /// Drive the reference [`ClipGraph`].
    pub fn with_clip_graph() -> Self {
        Self::new(Box::new(ClipGraph::new()))
    }

    /// Advance one tick and return the events raised by the playback.
    ///
    /// Locomotion signals are written first, then the playback advances, then
    /// event effects are applied to the table.
    pub fn tick(&mut self, dt: f32, signals: &LocomotionSignals) -> Vec<AnimationEvent> {
        self.write(Param::Speed, ParamValue::Float(signals.speed));
        self.write(Param::MotionSpeed, ParamValue::Float(signals.motion_speed));
        self.write(Param::Grounded, ParamValue::Bool(signals.grounded));
        if let Some(jump) = signals.jump {
            self.write(Param::Jump, ParamValue::Bool(jump));
        }
        if let Some(free_fall) = signals.free_fall {
            self.write(Param::FreeFall, ParamValue::Bool(free_fall));
        }

        let events = self.playback.advance(dt, &self.params);
        for event in &events {
            self.apply(*event);
        }
        events
    }

    /// Reproduce `state` exactly: play its clip at its time, overwrite every
    /// parameter, then settle with a negligible advance. Events raised while
    /// settling are discarded.
    pub fn force_set(&mut self, state: &AnimationState) {
        self.playback.play(state.clip, state.normalized_time);
        for (param, value) in ParamTable::entries_of(&state.params) {
            self.write(param, value);
        }
        let _ = self.playback.advance(SETTLE_DT, &self.params);
    }

    /// The serializable animation slice for the current tick.
    pub fn capture(&self) -> AnimationState {
        AnimationState {
            clip: self.playback.active_clip(),
            normalized_time: self.playback.normalized_time(),
            params: self.params.to_params(),
        }
    }

    /// Request attack `attack_id`. Unknown ids are logged and dropped.
    pub fn play_attack(&mut self, attack_id: i32) -> bool {
        if !ATTACK_IDS.contains(&attack_id) {
            tracing::warn!(attack_id, "attack not defined, dropping");
            return false;
        }
        self.write(Param::Attacking, ParamValue::Bool(true));
        self.write(Param::AttackId, ParamValue::Int(attack_id));
        true
    }

    /// Request hit reaction `take_damage_id`. Unknown ids are logged and
    /// dropped.
    pub fn play_take_damage(&mut self, take_damage_id: i32) -> bool {
        if !TAKE_DAMAGE_IDS.contains(&take_damage_id) {
            tracing::warn!(take_damage_id, "take damage reaction not defined, dropping");
            return false;
        }
        self.write(Param::TakingDamage, ParamValue::Bool(true));
        self.write(Param::TakeDamageId, ParamValue::Int(take_damage_id));
        true
    }

    /// Request parry animation `parry_id`. A parry that is being received
    /// sets the id without the parrying flag.
    pub fn play_parry(&mut self, parry_id: i32, being_parried: bool) -> bool {
        if !PARRY_IDS.contains(&parry_id) {
            tracing::warn!(parry_id, "parry not defined, dropping");
            return false;
        }
        if !being_parried {
            self.write(Param::Parrying, ParamValue::Bool(true));
        }
        self.write(Param::ParryId, ParamValue::Int(parry_id));
        true
    }

    /// Read a bool parameter.
    pub fn flag(&self, param: Param) -> bool {
        self.params.flag(param)
    }

    /// Read an int parameter.
    pub fn id(&self, param: Param) -> i32 {
        self.params.id(param)
    }

    /// The parameter table.
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    fn apply(&mut self, event: AnimationEvent) {
        use ParamValue::{Bool, Int};
        match event {
            AnimationEvent::EnableCanBeParried => {
                self.write(Param::CanBeParried, Bool(true));
            }
            AnimationEvent::DisableCanBeParried => {
                self.write(Param::CanBeParried, Bool(false));
            }
            AnimationEvent::EnableMeleeDamage => {
                self.write(Param::CanDealMeleeDamage, Bool(true));
            }
            AnimationEvent::DisableMeleeDamage => {
                self.write(Param::CanDealMeleeDamage, Bool(false));
            }
            AnimationEvent::EnableCombo => {
                self.write(Param::CanCombo, Bool(true));
            }
            AnimationEvent::DisableCombo => {
                self.write(Param::CanCombo, Bool(false));
                self.write(Param::ComboWindowClosed, Bool(true));
            }
            AnimationEvent::AttackEntered => self.reset_attack_windows(),
            AnimationEvent::AttackExited => {
                self.write(Param::Attacking, Bool(false));
                self.write(Param::AttackId, Int(0));
                self.reset_attack_windows();
            }
            AnimationEvent::TakeDamageExited => {
                self.write(Param::TakingDamage, Bool(false));
                self.write(Param::TakeDamageId, Int(0));
            }
            AnimationEvent::ParryExited => {
                self.write(Param::Parrying, Bool(false));
                self.write(Param::ParryId, Int(0));
            }
            AnimationEvent::ReachedDamageFrame | AnimationEvent::Interrupted => {}
        }
    }

    fn reset_attack_windows(&mut self) {
        self.write(Param::CanCombo, ParamValue::Bool(false));
        self.write(Param::ComboWindowClosed, ParamValue::Bool(false));
        self.write(Param::CanDealMeleeDamage, ParamValue::Bool(false));
        self.write(Param::CanBeParried, ParamValue::Bool(false));
    }

    fn write(&mut self, param: Param, value: ParamValue) -> bool {
        match self.params.set(param, value) {
            Ok(changed) => changed,
            Err(error) => {
                tracing::warn!(%error, "animation parameter write rejected");
                false
            }
        }
    }
}

impl fmt::Debug for AnimationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationStep")
            .field("clip", &self.playback.active_clip())
            .field("normalized_time", &self.playback.normalized_time())
            .field("params", &self.params)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn grounded() -> LocomotionSignals {
        LocomotionSignals {
            motion_speed: 1.0,
            grounded: true,
            ..Default::default()
        }
    }

    // -- ParamTable ---------------------------------------------------------

    #[test]
    fn register_twice_is_an_error() {
        let mut table = ParamTable::new();
        table.register(Param::Jump, ParamKind::Bool).unwrap();
        let err = table.register(Param::Jump, ParamKind::Bool).unwrap_err();
        assert_eq!(err, ParamError::AlreadyRegistered { param: Param::Jump });
    }

    #[test]
    fn wrong_kind_write_is_rejected() {
        let mut table = ParamTable::standard();
        let err = table.set(Param::AttackId, ParamValue::Bool(true)).unwrap_err();
        assert_eq!(
            err,
            ParamError::KindMismatch {
                param: Param::AttackId,
                expected: ParamKind::Int,
                found: ParamKind::Bool,
            }
        );
    }

    #[test]
    fn unregistered_write_is_rejected() {
        let mut table = ParamTable::new();
        assert!(table.set(Param::Speed, ParamValue::Float(1.0)).is_err());
    }

    #[test]
    fn equal_write_reports_no_change() {
        let mut table = ParamTable::standard();
        assert!(table.set(Param::CanCombo, ParamValue::Bool(true)).unwrap());
        assert!(!table.set(Param::CanCombo, ParamValue::Bool(true)).unwrap());
    }

    #[test]
    fn table_image_roundtrips() {
        let params = AnimationParams {
            speed: 2.5,
            attacking: true,
            attack_id: 102,
            can_combo: true,
            ..AnimationParams::default()
        };
        let mut table = ParamTable::standard();
        for (param, value) in ParamTable::entries_of(&params) {
            table.set(param, value).unwrap();
        }
        assert_eq!(table.to_params(), params);
    }

    // -- AnimationStep ------------------------------------------------------

    #[test]
    fn unknown_ids_are_dropped() {
        let mut step = AnimationStep::with_clip_graph();
        assert!(!step.play_attack(999));
        assert!(!step.play_take_damage(7));
        assert!(!step.play_parry(50, false));
        assert!(!step.flag(Param::Attacking));
        assert_eq!(step.id(Param::ParryId), 0);
    }

    #[test]
    fn being_parried_sets_id_without_flag() {
        let mut step = AnimationStep::with_clip_graph();
        assert!(step.play_parry(52, true));
        assert!(!step.flag(Param::Parrying));
        assert_eq!(step.id(Param::ParryId), 52);
    }

    #[test]
    fn attack_runs_through_its_windows_and_resets() {
        let mut step = AnimationStep::with_clip_graph();
        step.play_attack(101);

        let mut seen = Vec::new();
        let mut saw_damage_window = false;
        let mut saw_combo_window = false;
        for _ in 0..120 {
            seen.extend(step.tick(DT, &grounded()));
            saw_damage_window |= step.flag(Param::CanDealMeleeDamage);
            saw_combo_window |= step.flag(Param::CanCombo);
        }

        assert!(saw_damage_window);
        assert!(saw_combo_window);
        assert!(seen.contains(&AnimationEvent::ReachedDamageFrame));
        assert!(seen.contains(&AnimationEvent::AttackExited));
        assert!(!step.flag(Param::Attacking));
        assert_eq!(step.id(Param::AttackId), 0);
        assert!(!step.flag(Param::ComboWindowClosed));
        assert_eq!(step.capture().clip, ClipGraph::locomotion_clip());
    }

    #[test]
    fn hit_reaction_interrupts_attack() {
        let mut step = AnimationStep::with_clip_graph();
        step.play_attack(104);
        for _ in 0..5 {
            step.tick(DT, &grounded());
        }
        step.play_take_damage(1);
        let events = step.tick(DT, &grounded());
        assert!(events.contains(&AnimationEvent::Interrupted));
        assert!(events.contains(&AnimationEvent::AttackExited));
        assert!(!step.flag(Param::Attacking));
        assert!(step.flag(Param::TakingDamage));
    }

    #[test]
    fn force_set_reproduces_captured_state() {
        let mut original = AnimationStep::with_clip_graph();
        original.play_attack(101);
        for _ in 0..20 {
            original.tick(DT, &grounded());
        }
        let captured = original.capture();

        let mut copy = AnimationStep::with_clip_graph();
        copy.force_set(&captured);
        assert_eq!(copy.capture(), captured);

        // Both continue identically.
        for _ in 0..40 {
            let a = original.tick(DT, &grounded());
            let b = copy.tick(DT, &grounded());
            assert_eq!(a, b);
            assert_eq!(original.capture(), copy.capture());
        }
    }
}
