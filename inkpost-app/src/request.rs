//! Request types and the transaction classifier.

/// A message handled by exactly one registered handler.
///
/// `NAME` doubles as the type's wire-visible identity in logs and errors,
/// and feeds the naming convention the classifier falls back on.
pub trait Request: Send + 'static {
    /// Value carried inside a successful [`Outcome`](crate::Outcome).
    type Response: Send + 'static;

    /// Type name, e.g. `"CreatePostCommand"`.
    const NAME: &'static str;

    /// Explicit transaction capability. Opt-in only: `true` forces a
    /// transaction regardless of the type's name, and the default `false`
    /// defers to the `*command` naming convention. A type named `*Command`
    /// cannot opt out.
    const TRANSACTIONAL: bool = false;
}

/// Decides whether dispatching `R` wraps the handler in a transaction:
/// the explicit capability, or a case-insensitive `command` name suffix.
/// Called once per registration, never per dispatch.
pub fn is_transactional<R: Request>() -> bool {
    R::TRANSACTIONAL || R::NAME.to_ascii_lowercase().ends_with("command")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainCommand;
    impl Request for PlainCommand {
        type Response = ();
        const NAME: &'static str = "PlainCommand";
    }

    struct ShoutedCommand;
    impl Request for ShoutedCommand {
        type Response = ();
        const NAME: &'static str = "SHOUTEDCOMMAND";
    }

    struct PlainQuery;
    impl Request for PlainQuery {
        type Response = ();
        const NAME: &'static str = "PlainQuery";
    }

    struct MarkedQuery;
    impl Request for MarkedQuery {
        type Response = ();
        const NAME: &'static str = "MarkedQuery";
        const TRANSACTIONAL: bool = true;
    }

    #[test]
    fn command_suffix_opts_in() {
        assert!(is_transactional::<PlainCommand>());
    }

    #[test]
    fn suffix_match_ignores_case() {
        assert!(is_transactional::<ShoutedCommand>());
    }

    #[test]
    fn other_names_default_to_no_transaction() {
        assert!(!is_transactional::<PlainQuery>());
    }

    #[test]
    fn capability_forces_a_transaction_for_any_name() {
        assert!(is_transactional::<MarkedQuery>());
    }
}
