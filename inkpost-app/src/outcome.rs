//! Business-level result of handling a request.

/// What a handler produced: a value, or the reasons it declined.
///
/// `Failure` carries human-readable messages (validation problems, conflicts,
/// lookups that found nothing). It is an ordinary return value, not an error:
/// the pipeline commits transactions around failures just as it does around
/// successes. Infrastructure trouble travels as `Err(AppError)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Failure(Vec<String>),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(vec![message.into()])
    }

    pub fn failures(messages: Vec<String>) -> Self {
        Outcome::Failure(messages)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The produced value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Outcome::Success(v) => Some(v),
            Outcome::Failure(_) => None,
        }
    }

    /// Failure messages; empty for a success.
    pub fn errors(&self) -> &[String] {
        match self {
            Outcome::Success(_) => &[],
            Outcome::Failure(msgs) => msgs,
        }
    }
}
