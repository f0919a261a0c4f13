use log::warn;
use std::fmt;

/// A soft problem: generation continues, the document stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Where it happened, e.g. `api.go:ItemController.Get`.
    pub context: String,
    pub message: String,
}

impl Warning {
    /// Creates the warning and logs it.
    pub fn emit(context: impl Into<String>, message: impl Into<String>) -> Self {
        let warning = Self {
            context: context.into(),
            message: message.into(),
        };
        warn!("{}", warning);
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.context, self.message)
    }
}
