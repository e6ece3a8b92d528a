use thiserror::Error;

pub type SeqResult<T> = Result<T, SeqError>;

/// Errors surfaced by the sequencer.
///
/// Contract violations (an unsupported pixel depth, a zero-sized mode) are
/// deliberately *not* represented here: those are programmer errors, kept
/// unrepresentable by the types or caught by an assertion at the call
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeqError {
    /// A busy flag did not clear within the configured poll budget.
    ///
    /// A stuck flag usually means a gated source clock or a wedged DMA
    /// engine.
    #[error("{what} still busy after {polls} polls at {interval_ms} ms")]
    HardwareTimeout {
        /// Which synchronization point timed out.
        what: &'static str,
        /// How many times the flag was sampled.
        polls: u32,
        /// Settle interval between samples.
        interval_ms: u32,
    },
}
