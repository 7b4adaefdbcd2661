//! Single-pass simulation run and its phase state machine.

use crate::{
    AddressSpace, CorruptionReport, CorruptionReporter, FieldId, FieldKind, FieldValue,
    InputSource, RawReadChannel, RegionHandle, SimError, Snapshot, SpaceConfig, TypedRegionView,
    WriteOp,
};

/// Phases of one simulation run, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunPhase {
    /// Regions and fields may be registered and seeded.
    #[default]
    Initialized,
    /// The before-state has been captured.
    Snapshotted,
    /// The single raw read has been performed.
    WriteExecuted,
    /// The after-state was captured and diffed; the run is finished.
    Reported,
}

impl RunPhase {
    /// Lowercase label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Snapshotted => "snapshotted",
            Self::WriteExecuted => "write-executed",
            Self::Reported => "reported",
        }
    }

    /// Returns `true` once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Reported)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Record of the raw read.
    pub write: WriteOp,
    /// Field values captured before the read.
    pub before: Snapshot,
    /// Field values captured after the read.
    pub after: Snapshot,
    /// Fields whose value changed.
    pub report: CorruptionReport,
}

/// One simulation run over a freshly built address space.
///
/// A run moves `Initialized → Snapshotted → WriteExecuted → Reported` exactly
/// once; a new run needs a new instance.
#[derive(Debug, Clone, Default)]
pub struct SimulationRun {
    space: AddressSpace,
    view: TypedRegionView,
    channel: RawReadChannel,
    reporter: CorruptionReporter,
    phase: RunPhase,
    before: Option<Snapshot>,
    write: Option<WriteOp>,
}

impl SimulationRun {
    /// Creates a run over an empty address space.
    #[must_use]
    pub fn new(config: SpaceConfig) -> Self {
        Self {
            space: AddressSpace::new(config),
            view: TypedRegionView::new(),
            channel: RawReadChannel::new(),
            reporter: CorruptionReporter::new(),
            phase: RunPhase::Initialized,
            before: None,
            write: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The simulated address space.
    #[must_use]
    pub const fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// The field overlay.
    #[must_use]
    pub const fn view(&self) -> &TypedRegionView {
        &self.view
    }

    fn expect_phase(&self, expected: RunPhase, action: &'static str) -> Result<(), SimError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SimError::PhaseViolation {
                action,
                phase: self.phase.label(),
            })
        }
    }

    /// Registers a region; see [`AddressSpace::register_region`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] after the run has been snapshotted,
    /// plus any registration error.
    pub fn register_region(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<RegionHandle, SimError> {
        self.expect_phase(RunPhase::Initialized, "register a region")?;
        self.space.register_region(name, capacity)
    }

    /// Declares a field; see [`TypedRegionView::declare_field`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] after the run has been snapshotted,
    /// plus any declaration error.
    pub fn declare_field(
        &mut self,
        region: RegionHandle,
        name: impl Into<String>,
        offset: usize,
        width: usize,
        kind: FieldKind,
    ) -> Result<FieldId, SimError> {
        self.expect_phase(RunPhase::Initialized, "declare a field")?;
        self.view
            .declare_field(&self.space, region, name, offset, width, kind)
    }

    /// Seeds `region.field` with `value` before the run starts.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] after the run has been snapshotted,
    /// plus lookup and encoding errors.
    pub fn write_field(
        &mut self,
        region: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<(), SimError> {
        self.expect_phase(RunPhase::Initialized, "seed a field")?;
        let id = self.view.find(&self.space, region, field)?;
        self.view.write_field(&mut self.space, id, value)
    }

    /// Captures the before-state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] unless the run is initialized.
    pub fn snapshot_before(&mut self) -> Result<&Snapshot, SimError> {
        self.expect_phase(RunPhase::Initialized, "take the before snapshot")?;
        let snapshot = self.reporter.snapshot(&self.space, &self.view)?;
        self.phase = RunPhase::Snapshotted;
        Ok(self.before.insert(snapshot))
    }

    /// Performs the run's single raw read into `destination`.
    ///
    /// A refused read leaves the run in the snapshotted phase.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] unless the run is snapshotted,
    /// [`SimError::UnknownRegion`] for an unknown destination, and
    /// [`SimError::AddressSpaceExhausted`] when the read would leave the space.
    pub fn execute<S: InputSource + ?Sized>(
        &mut self,
        destination: &str,
        requested: usize,
        source: &mut S,
    ) -> Result<&WriteOp, SimError> {
        self.expect_phase(RunPhase::Snapshotted, "execute the read")?;
        let handle = self.space.find(destination)?;
        let op = self
            .channel
            .read_into(&mut self.space, handle, requested, source)?;
        self.phase = RunPhase::WriteExecuted;
        Ok(self.write.insert(op))
    }

    /// Captures the after-state, diffs it and finishes the run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhaseViolation`] unless the read has executed.
    pub fn report(&mut self) -> Result<SimulationOutcome, SimError> {
        self.expect_phase(RunPhase::WriteExecuted, "report")?;
        let after = self.reporter.snapshot(&self.space, &self.view)?;
        let (Some(before), Some(write)) = (self.before.take(), self.write.take()) else {
            return Err(SimError::PhaseViolation {
                action: "report",
                phase: self.phase.label(),
            });
        };
        let report = self.reporter.diff(&before, &after);
        self.phase = RunPhase::Reported;
        Ok(SimulationOutcome {
            write,
            before,
            after,
            report,
        })
    }

    /// Runs snapshot, read and report back to back.
    ///
    /// # Errors
    ///
    /// Propagates the first failing phase.
    pub fn run_once<S: InputSource + ?Sized>(
        &mut self,
        destination: &str,
        requested: usize,
        source: &mut S,
    ) -> Result<SimulationOutcome, SimError> {
        self.snapshot_before()?;
        self.execute(destination, requested, source)?;
        self.report()
    }
}
