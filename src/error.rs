/// Fatal, protocol-level failures. These are distinct from merge conflicts
/// (`apply` returning `false`), which are expected data-carrying outcomes
/// routed to `rejected` rather than surfaced as `Err`.
///
/// There is no variant for "shift called before apply" — `Update::shift`
/// only accepts the `Bookkeeping` a successful `apply` produces, so that
/// mistake is unrepresentable rather than a runtime check.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}
