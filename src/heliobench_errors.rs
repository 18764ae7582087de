use thiserror::Error;

/// Error taxonomy for the whole evaluation pipeline.
///
/// The variants map onto the failure classes the orchestrator distinguishes:
///
/// * [`InvalidRunParameter`](HeliobenchError::InvalidRunParameter) and
///   [`InputFileNotFound`](HeliobenchError::InputFileNotFound) are configuration
///   errors, reported before any chunk work starts.
/// * [`SimulationFailure`](HeliobenchError::SimulationFailure) is fatal to the
///   owning chunk only; no partial catalog is persisted.
/// * [`DataConsistency`](HeliobenchError::DataConsistency) marks a contract
///   violation between pipeline stages (wrong detection count per object,
///   unknown cluster number, conflicting cluster identities).
/// * [`ExternalTool`](HeliobenchError::ExternalTool) covers spawn failures and
///   missing or empty expected output files of the two external executables.
#[derive(Error, Debug)]
pub enum HeliobenchError {
    #[error("Invalid run parameter: {0}")]
    InvalidRunParameter(String),

    #[error("Required input file not found: {0}")]
    InputFileNotFound(String),

    #[error("Trajectory simulation failed: {0}")]
    SimulationFailure(String),

    #[error("Data consistency fault: {0}")]
    DataConsistency(String),

    #[error("External tool failure: {0}")]
    ExternalTool(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Integer field parsing error: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("Float field parsing error: {0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("ROOTS finding error: {0}")]
    RootFindingError(#[from] roots::SearchError),
}

impl PartialEq for HeliobenchError {
    fn eq(&self, other: &Self) -> bool {
        use HeliobenchError::*;
        match (self, other) {
            (InvalidRunParameter(a), InvalidRunParameter(b)) => a == b,
            (InputFileNotFound(a), InputFileNotFound(b)) => a == b,
            (SimulationFailure(a), SimulationFailure(b)) => a == b,
            (DataConsistency(a), DataConsistency(b)) => a == b,
            (ExternalTool(a), ExternalTool(b)) => a == b,

            // Source errors without Eq: equal if same variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            (ParseIntError(a), ParseIntError(b)) => a == b,
            (ParseFloatError(a), ParseFloatError(b)) => a == b,
            (RootFindingError(a), RootFindingError(b)) => a == b,

            _ => false,
        }
    }
}
