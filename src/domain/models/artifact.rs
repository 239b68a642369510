//! Generated artifact kinds and their delimiter contract.

use serde::{Deserialize, Serialize};

/// The two artifacts every generation response is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The Verilog hardware description.
    Design,
    /// The cocotb (Python) testbench.
    Testbench,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Design, ArtifactKind::Testbench];

    /// Marker opening the delimited block in a generation response.
    pub fn start_marker(self) -> &'static str {
        match self {
            ArtifactKind::Design => "/// VERILOG START",
            ArtifactKind::Testbench => "/// PYTHON START",
        }
    }

    /// Marker closing the delimited block.
    pub fn end_marker(self) -> &'static str {
        match self {
            ArtifactKind::Design => "/// VERILOG END",
            ArtifactKind::Testbench => "/// PYTHON END",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Design => write!(f, "design"),
            ArtifactKind::Testbench => write!(f, "testbench"),
        }
    }
}
