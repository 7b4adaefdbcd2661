//! Serializable description of a complete simulation run.
//!
//! A [`Scenario`] names the regions in adjacency order, the fields laid over
//! them, the values seeded before the run, and the single raw read to
//! perform. Hosts deserialize it from whatever format they like and call
//! [`Scenario::run`].

use serde::{Deserialize, Serialize};

use crate::{
    BufferSource, ByteOrder, ChunkedSource, FieldKind, FieldValue, InputSource, PatternSource,
    SimError, SimulationOutcome, SimulationRun, SpaceConfig,
};

/// Name of the built-in scenario returned by [`Scenario::person_overflow`].
pub const PERSON_OVERFLOW: &str = "person-overflow";

/// Size of the `heap_top` region trailing the built-in scenario's `person`.
pub const HEAP_TOP_CAPACITY: usize = 64;

/// A full run description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Scenario {
    /// Byte order for every multi-byte field.
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Regions in registration (and therefore adjacency) order.
    pub regions: Vec<RegionSpec>,
    /// Field values written before the before-snapshot.
    #[serde(default)]
    pub initial: Vec<InitialValue>,
    /// The run's single raw read.
    pub read: ReadSpec,
}

/// One region and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionSpec {
    /// Unique region name.
    pub name: String,
    /// Declared size in bytes.
    pub capacity: usize,
    /// Fields laid over the region.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Byte offset from the region base.
    pub offset: usize,
    /// Byte width.
    pub width: usize,
    /// Decode kind.
    pub kind: FieldKind,
}

/// A value seeded into a field before the run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InitialValue {
    /// Owning region name.
    pub region: String,
    /// Field name.
    pub field: String,
    /// Value to write.
    pub value: ScalarValue,
}

/// Format-friendly field value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Any integer that fits `i64`.
    Integer(i64),
    /// Integers above `i64::MAX`.
    Unsigned(u64),
    /// Character data.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl From<&ScalarValue> for FieldValue {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Integer(v) => Self::Signed(*v),
            ScalarValue::Unsigned(v) => Self::Unsigned(*v),
            ScalarValue::Text(text) => Self::Chars(text.as_bytes().to_vec()),
            ScalarValue::Bytes(bytes) => Self::Bytes(bytes.clone()),
        }
    }
}

/// The raw read performed by a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReadSpec {
    /// Destination region name.
    pub destination: String,
    /// Requested byte count.
    pub length: usize,
    /// Where the bytes come from.
    pub input: InputSpec,
}

/// Deterministic input description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputSpec {
    /// Counter bytes from `seed`, endless unless `len` is given.
    Pattern {
        /// First byte produced.
        #[serde(default)]
        seed: u8,
        /// Total bytes available, if finite.
        #[serde(default)]
        len: Option<usize>,
    },
    /// Literal bytes.
    Bytes {
        /// Bytes in order.
        bytes: Vec<u8>,
    },
    /// UTF-8 text.
    Text {
        /// Text whose bytes are produced.
        text: String,
    },
    /// Another input capped at `chunk` bytes per read.
    Chunked {
        /// Maximum bytes per read call.
        chunk: usize,
        /// Wrapped input.
        inner: Box<InputSpec>,
    },
}

impl InputSpec {
    /// Opens a fresh source producing this input from the start.
    #[must_use]
    pub fn open(&self) -> Box<dyn InputSource> {
        match self {
            Self::Pattern { seed, len: None } => Box::new(PatternSource::endless(*seed)),
            Self::Pattern {
                seed,
                len: Some(len),
            } => Box::new(PatternSource::bounded(*seed, *len)),
            Self::Bytes { bytes } => Box::new(BufferSource::new(bytes.clone())),
            Self::Text { text } => Box::new(BufferSource::new(text.as_bytes())),
            Self::Chunked { chunk, inner } => Box::new(ChunkedSource::new(inner.open(), *chunk)),
        }
    }
}

impl Scenario {
    /// The overflow from the classic `read_it` example: a 32-byte `name`
    /// buffer followed by a `person` object whose `age` is set to 42, then a
    /// 100-byte read of distinct bytes into `name`.
    ///
    /// The heap's unallocated top chunk ([`HEAP_TOP_CAPACITY`] bytes) follows
    /// `person`, so the read ends inside the space instead of past it.
    #[must_use]
    pub fn person_overflow() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            regions: vec![
                RegionSpec {
                    name: "name".into(),
                    capacity: 32,
                    fields: Vec::new(),
                },
                RegionSpec {
                    name: "person".into(),
                    capacity: 40,
                    fields: vec![
                        FieldSpec {
                            name: "name_bytes".into(),
                            offset: 0,
                            width: 24,
                            kind: FieldKind::Chars,
                        },
                        FieldSpec {
                            name: "age".into(),
                            offset: 24,
                            width: 4,
                            kind: FieldKind::Signed,
                        },
                    ],
                },
                RegionSpec {
                    name: "heap_top".into(),
                    capacity: HEAP_TOP_CAPACITY,
                    fields: Vec::new(),
                },
            ],
            initial: vec![
                InitialValue {
                    region: "person".into(),
                    field: "name_bytes".into(),
                    value: ScalarValue::Text("bob".into()),
                },
                InitialValue {
                    region: "person".into(),
                    field: "age".into(),
                    value: ScalarValue::Integer(42),
                },
            ],
            read: ReadSpec {
                destination: "name".into(),
                length: 100,
                input: InputSpec::Pattern {
                    seed: 0,
                    len: Some(100),
                },
            },
        }
    }

    /// Registers regions and fields and seeds initial values.
    ///
    /// # Errors
    ///
    /// Propagates the first declaration or seeding error.
    pub fn build(&self) -> Result<SimulationRun, SimError> {
        let mut run = SimulationRun::new(SpaceConfig {
            byte_order: self.byte_order,
        });
        for region in &self.regions {
            let handle = run.register_region(region.name.clone(), region.capacity)?;
            for field in &region.fields {
                run.declare_field(
                    handle,
                    field.name.clone(),
                    field.offset,
                    field.width,
                    field.kind,
                )?;
            }
        }
        for initial in &self.initial {
            run.write_field(&initial.region, &initial.field, &FieldValue::from(&initial.value))?;
        }
        Ok(run)
    }

    /// Builds the run and performs all phases.
    ///
    /// # Errors
    ///
    /// Propagates build errors and the read's exhaustion error.
    pub fn run(&self) -> Result<SimulationOutcome, SimError> {
        let mut run = self.build()?;
        let mut source = self.read.input.open();
        run.run_once(&self.read.destination, self.read.length, &mut source)
    }
}

#[cfg(test)]
mod tests {
    use super::{InputSpec, Scenario, HEAP_TOP_CAPACITY};
    use crate::{FieldValue, SimError};

    #[test]
    fn builtin_scenario_corrupts_both_person_fields() {
        let outcome = Scenario::person_overflow().run().expect("run");

        assert_eq!(outcome.write.written(), 100);
        assert_eq!(outcome.report.len(), 2);
        let name = outcome
            .report
            .change("person", "name_bytes")
            .expect("name changed");
        assert_eq!(name.old, FieldValue::Chars(b"bob".to_vec()));
        assert_eq!(name.new, FieldValue::Chars((32..56).collect()));
        let age = outcome.report.change("person", "age").expect("age changed");
        assert_eq!(
            age.new,
            FieldValue::Signed(i64::from(i32::from_le_bytes([56, 57, 58, 59])))
        );
    }

    #[test]
    fn chunked_input_produces_short_read() {
        let mut scenario = Scenario::person_overflow();
        scenario.read.input = InputSpec::Chunked {
            chunk: 16,
            inner: Box::new(scenario.read.input.clone()),
        };
        let outcome = scenario.run().expect("run");
        assert!(outcome.write.is_short());
        assert_eq!(outcome.write.written(), 16);
        assert!(outcome.report.is_empty());
    }

    #[test]
    fn unknown_initial_field_fails_build() {
        let mut scenario = Scenario::person_overflow();
        scenario.initial[0].field = "nickname".into();
        assert!(matches!(
            scenario.build(),
            Err(SimError::UnknownField { .. })
        ));
    }

    #[test]
    fn builtin_read_fits_before_the_space_end() {
        let run = Scenario::person_overflow().build().expect("build");
        assert_eq!(run.space().end(), 32 + 40 + HEAP_TOP_CAPACITY);
        assert!(Scenario::person_overflow().read.length <= run.space().end());
    }

    #[test]
    fn oversized_read_is_refused() {
        let mut scenario = Scenario::person_overflow();
        scenario.read.length = 137;
        assert!(matches!(
            scenario.run(),
            Err(SimError::AddressSpaceExhausted { available: 136, .. })
        ));
    }
}
