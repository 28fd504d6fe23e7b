use std::process::ExitCode;

use derive_more::Display;

/// Why the process stopped. Each reason maps to its own exit code so a service manager can decide
/// whether to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Termination {
    #[display("interrupted")]
    Interrupted,

    #[display("unexpected failure")]
    Unexpected,

    #[display("configuration error")]
    Configuration,

    #[display("relay connection lost")]
    ConnectionLost,
}

impl Termination {
    pub fn code(&self) -> u8 {
        match self {
            Termination::Interrupted => 0,
            Termination::Unexpected => 1,
            Termination::Configuration => 2,
            Termination::ConnectionLost => 3,
        }
    }
}

impl From<Termination> for ExitCode {
    fn from(termination: Termination) -> Self {
        ExitCode::from(termination.code())
    }
}
