use std::fmt;
use serde::Serialize;
use tracing::debug;
use crate::sql::{LocatedObject, ObjectKind};

/// Creation phase an object is restored in.
///
/// Assignment is purely by kind. Objects that reference each other inside
/// one phase (a trigger calling a function, a type built on another type)
/// are not reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    CoreInfrastructure = 1,
    Types = 2,
    Tables = 3,
    Indexes = 4,
    Functions = 5,
    Policies = 6,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::CoreInfrastructure,
        Phase::Types,
        Phase::Tables,
        Phase::Indexes,
        Phase::Functions,
        Phase::Policies,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn title(&self) -> &'static str {
        match self {
            Phase::CoreInfrastructure => "CORE INFRASTRUCTURE",
            Phase::Types => "TYPES",
            Phase::Tables => "TABLES",
            Phase::Indexes => "INDEXES AND CONSTRAINTS",
            Phase::Functions => "FUNCTIONS, VIEWS AND TRIGGERS",
            Phase::Policies => "POLICIES, COMMENTS AND GRANTS",
        }
    }

    /// Kinds restored in this phase, in the order they are emitted
    pub fn kinds(&self) -> &'static [ObjectKind] {
        match self {
            Phase::CoreInfrastructure => &[ObjectKind::Schema, ObjectKind::Extension],
            Phase::Types => &[ObjectKind::Type],
            Phase::Tables => &[ObjectKind::Sequence, ObjectKind::Table],
            Phase::Indexes => &[ObjectKind::Index, ObjectKind::Constraint],
            Phase::Functions => &[ObjectKind::Function, ObjectKind::View, ObjectKind::Trigger],
            Phase::Policies => &[ObjectKind::Policy, ObjectKind::Comment, ObjectKind::Grant],
        }
    }

    /// The static kind → phase table
    pub fn of(kind: ObjectKind) -> Phase {
        match kind {
            ObjectKind::Schema | ObjectKind::Extension => Phase::CoreInfrastructure,
            ObjectKind::Type => Phase::Types,
            ObjectKind::Sequence | ObjectKind::Table => Phase::Tables,
            ObjectKind::Index | ObjectKind::Constraint => Phase::Indexes,
            ObjectKind::Function | ObjectKind::View | ObjectKind::Trigger => Phase::Functions,
            ObjectKind::Policy | ObjectKind::Comment | ObjectKind::Grant => Phase::Policies,
        }
    }

    fn kind_rank(&self, kind: ObjectKind) -> usize {
        self.kinds()
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PHASE {}: {}", self.number(), self.title())
    }
}

/// Objects bucketed into phases, each bucket in deterministic order
#[derive(Debug, Clone)]
pub struct RestorationPlan {
    phases: Vec<(Phase, Vec<LocatedObject>)>,
}

impl RestorationPlan {
    /// Bucket located objects by phase.
    ///
    /// Within a phase the order is: kind order from `Phase::kinds`, then the
    /// object identifier (byte-wise), then occurrence.
    pub fn from_located(objects: Vec<LocatedObject>) -> Self {
        let mut phases: Vec<(Phase, Vec<LocatedObject>)> =
            Phase::ALL.iter().map(|phase| (*phase, Vec::new())).collect();

        for located in objects {
            let phase = Phase::of(located.object.kind);
            phases[phase.number() as usize - 1].1.push(located);
        }

        for (phase, bucket) in phases.iter_mut() {
            bucket.sort_by_cached_key(|located| {
                (
                    phase.kind_rank(located.object.kind),
                    located.object.identifier(),
                    located.object.occurrence,
                )
            });
            debug!("{} holds {} object(s)", phase, bucket.len());
        }

        Self { phases }
    }

    /// Phases in restoration order, including empty ones
    pub fn phases(&self) -> impl Iterator<Item = (Phase, &[LocatedObject])> {
        self.phases
            .iter()
            .map(|(phase, objects)| (*phase, objects.as_slice()))
    }

    pub fn objects_in(&self, phase: Phase) -> &[LocatedObject] {
        &self.phases[phase.number() as usize - 1].1
    }

    /// All objects in restoration order
    pub fn ordered(&self) -> impl Iterator<Item = &LocatedObject> {
        self.phases.iter().flat_map(|(_, objects)| objects.iter())
    }

    pub fn len(&self) -> usize {
        self.phases.iter().map(|(_, objects)| objects.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing(&self) -> impl Iterator<Item = &LocatedObject> {
        self.ordered().filter(|located| !located.is_found())
    }
}
