/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
}

impl ShutdownReason {
    pub fn describe(&self) -> String {
        match self {
            ShutdownReason::Signal(signal) => format!("signal {}", signal),
            ShutdownReason::Error(message) => format!("error: {}", message),
            ShutdownReason::UserRequest => "user request".to_string(),
        }
    }
}

/// One-shot request, carried in from an outer flow such as login, to
/// open the meal scanner as soon as the app is up.
///
/// Redeeming consumes the value, so the request cannot fire twice and
/// cannot survive into a later run.
#[derive(Debug)]
pub struct ScanHandoff {
    auto_scan: bool,
}

impl ScanHandoff {
    /// A handoff that asks for the scanner to open on startup.
    pub fn requested() -> Self {
        Self { auto_scan: true }
    }

    /// The usual case: nothing was requested.
    pub fn none() -> Self {
        Self { auto_scan: false }
    }

    /// Consume the handoff, reporting whether a scan was requested.
    pub fn redeem(self) -> bool {
        self.auto_scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_redemption_consumes_the_request() {
        assert!(ScanHandoff::requested().redeem());
        assert!(!ScanHandoff::none().redeem());
    }

    #[test]
    fn test_shutdown_reason_descriptions() {
        assert_eq!(
            ShutdownReason::Signal("SIGINT".to_string()).describe(),
            "signal SIGINT"
        );
        assert_eq!(ShutdownReason::UserRequest.describe(), "user request");
        assert!(ShutdownReason::Error("boom".to_string())
            .describe()
            .contains("boom"));
    }
}
