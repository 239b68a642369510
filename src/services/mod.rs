//! Service layer: the repair loop and its collaborator components.

pub mod extract;
pub mod layout;
pub mod repair;
pub mod simulate;
pub mod trace;

pub use extract::{ArtifactExtractor, ExtractError, ExtractionReport};
pub use layout::LayoutHandoff;
pub use repair::{RepairEvent, RepairLoop};
pub use simulate::{SimOutcome, VerificationRunner};
pub use trace::{TraceError, WaveSampler, WaveTable};
