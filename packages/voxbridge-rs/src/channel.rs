use crate::error::BridgeError;

/// Last-error cache polled by callers after any failing operation.
///
/// Every failing call overwrites `last_error`; the runtime-exception slot is
/// only touched when the failure came out of the embedded runtime. Both
/// persist across successful calls until [`ErrorChannel::clear`] resets them.
#[derive(Debug, Default)]
pub struct ErrorChannel {
    last_error: Option<String>,
    last_runtime_exception: Option<String>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed call, overwriting whatever was stored before.
    pub fn record(&mut self, error: &BridgeError) {
        self.last_error = Some(error.to_string());
        if let Some(message) = error.runtime_exception() {
            self.last_runtime_exception = Some(message.to_owned());
        }
    }

    /// Most recent error message, preferring the runtime exception message
    /// when both are set.
    pub fn last_error(&self) -> Option<&str> {
        self.last_runtime_exception
            .as_deref()
            .or(self.last_error.as_deref())
    }

    /// Most recent exception message raised by the embedded runtime, if any.
    pub fn last_runtime_exception(&self) -> Option<&str> {
        self.last_runtime_exception.as_deref()
    }

    pub fn clear(&mut self) {
        self.last_error = None;
        self.last_runtime_exception = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn validation_failure_sets_only_last_error() {
        let mut channel = ErrorChannel::new();
        channel.record(&BridgeError::UnknownHandle(7));

        assert_eq!(channel.last_error(), Some("no active sink with id 7"));
        assert_eq!(channel.last_runtime_exception(), None);
    }

    #[test]
    fn runtime_exception_is_preferred_over_later_validation_error() {
        let mut channel = ErrorChannel::new();
        channel.record(&BridgeError::Engine(EngineError("out of memory".into())));
        channel.record(&BridgeError::DuplicateHandle(1));

        assert_eq!(channel.last_error(), Some("out of memory"));
        assert_eq!(channel.last_runtime_exception(), Some("out of memory"));
    }

    #[test]
    fn clear_resets_both_slots() {
        let mut channel = ErrorChannel::new();
        channel.record(&BridgeError::Engine(EngineError("boom".into())));
        channel.clear();

        assert_eq!(channel.last_error(), None);
        assert_eq!(channel.last_runtime_exception(), None);
    }
}
