use gradebook::records::{SmsTransport, TransportError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shipped SMS transport: writes each message to the log and always succeeds.
#[derive(Debug, Clone)]
pub(crate) struct LoggingSmsTransport {
    sender: String,
}

impl LoggingSmsTransport {
    pub(crate) fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl SmsTransport for LoggingSmsTransport {
    fn send(&self, destination_phone: &str, message: &str) -> Result<(), TransportError> {
        info!(
            sender = %self.sender,
            destination = destination_phone,
            body = message,
            "sms dispatched"
        );
        Ok(())
    }
}

pub(crate) fn parse_score(raw: &str) -> Result<f64, String> {
    let score: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a score ({err})"))?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(format!("score {score} must be between 0 and 100"));
    }
    Ok(score)
}

pub(crate) fn parse_cgpa(raw: &str) -> Result<f64, String> {
    let cgpa: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a CGPA ({err})"))?;
    if !cgpa.is_finite() || !(0.0..=4.0).contains(&cgpa) {
        return Err(format!("CGPA {cgpa} must be between 0.0 and 4.0"));
    }
    Ok(cgpa)
}
