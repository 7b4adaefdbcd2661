//! Deterministic memory-corruption simulator core for Spillway.
//!
//! Models a linear address space of adjacent named regions, a raw read that
//! never checks the destination's capacity, typed fields laid over region
//! bytes, and a before/after diff naming every field the read clobbered.

/// Error taxonomy shared by every operation.
pub mod error;
pub use error::{ErrorClass, SimError};

/// Address-space model: ordered regions and cross-region byte access.
pub mod memory;
pub use memory::{
    validate_extent, AddressSpace, ByteOrder, RegionDescriptor, RegionHandle, RegionSpan,
    SpaceConfig,
};

/// Typed field overlays on region bytes.
pub mod view;
pub use view::{Field, FieldId, FieldKind, FieldValue, TypedRegionView};

/// Raw, capacity-unchecked read channel and input sources.
pub mod channel;
pub use channel::{
    BufferSource, ChunkedSource, InputSource, IterSource, PatternSource, RawReadChannel, WriteOp,
};

/// Field snapshots and corruption diffing.
pub mod report;
pub use report::{CorruptionReport, CorruptionReporter, FieldChange, Snapshot, SnapshotEntry};

/// Single-pass run state machine.
pub mod run;
pub use run::{RunPhase, SimulationOutcome, SimulationRun};

/// Serializable scenario descriptions.
#[cfg(feature = "serde")]
pub mod scenario;
#[cfg(feature = "serde")]
pub use scenario::{
    FieldSpec, InitialValue, InputSpec, ReadSpec, RegionSpec, ScalarValue, Scenario,
    HEAP_TOP_CAPACITY, PERSON_OVERFLOW,
};

#[cfg(test)]
use proptest as _;
