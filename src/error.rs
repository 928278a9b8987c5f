//! Error taxonomy shared by all pipeline stages

/// Everything that can go wrong between a help text and a parsed map
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No usage section, malformed headings
    #[error("{0}")]
    Scan(String),

    /// Usage or description section failed to parse; position is a byte
    /// offset into the scanned block
    #[error("{message} at offset {position}")]
    SpecParse { message: String, position: usize },

    /// Ambiguous descriptions, unresolved references, unbindable option
    /// arguments
    #[error("{0}")]
    Solve(String),

    /// Argv failed to lex
    #[error("{0}")]
    ArgvLex(String),

    /// The matcher rejected the command line
    #[error(transparent)]
    Match(#[from] MatchError),

    /// A version flag fired but no version was configured
    #[error("version flag given but no version was provided")]
    VersionMissing,
}

/// Match-stage rejection, the error kind user-facing programs see most
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("{0}")]
    Generic(String),

    /// A required leaf was never matched and has no fallback
    #[error("missing required argument: {0}")]
    Missing(String),

    #[error("option {0} requires an argument")]
    RequiresArgument(String),

    #[error("option {0} does not take an argument")]
    NoArgumentExpected(String),

    /// Trailing or misplaced tokens
    #[error("{0} is not expected in this context")]
    Unexpected(String),
}

/// A branch-local match failure
///
/// Failures are ordinary values: alternation keeps the one that made it the
/// furthest through the input so the surfaced complaint is the most
/// relevant one. Fatal failures (option shape violations) short-circuit the
/// enclosing alternation instead of triggering backtracking.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    pub(crate) error: MatchError,
    /// Tokens consumed before failing
    pub(crate) depth: usize,
    pub(crate) fatal: bool,
}

impl Failure {
    pub(crate) fn fail(error: MatchError, depth: usize) -> Self {
        Failure {
            error,
            depth,
            fatal: false,
        }
    }

    pub(crate) fn fatal(error: MatchError, depth: usize) -> Self {
        Failure {
            error,
            depth,
            fatal: true,
        }
    }

    #[must_use]
    pub(crate) fn combine_with(self, other: Self) -> Self {
        match (self.fatal, other.fatal) {
            // fatal outcome takes priority
            (true, false) => self,
            (false, true) => other,
            // otherwise the deepest failure wins, first on ties
            _ => {
                if other.depth > self.depth {
                    other
                } else {
                    self
                }
            }
        }
    }
}
