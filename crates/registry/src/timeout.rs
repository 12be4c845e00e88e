use std::time::Duration;

use serde::Deserialize;

use crate::error::TimeoutError;

/// The handshake bound used when an entry does not name one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A timeout in whichever form a caller or a configuration file gives it.
///
/// Numbers are seconds and may be fractional. Strings are either a plain
/// number of seconds or a human readable duration such as `"1m 30s"`.
/// Everything is normalized with [`Timeout::to_duration`] before use.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawTimeout")]
pub enum Timeout {
    /// A number of seconds.
    Seconds(f64),
    /// A textual duration.
    Text(String),
    /// An exact duration.
    Exact(Duration),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeout {
    Seconds(f64),
    Text(String),
}

impl From<RawTimeout> for Timeout {
    #[inline]
    fn from(raw: RawTimeout) -> Self {
        match raw {
            RawTimeout::Seconds(secs) => Timeout::Seconds(secs),
            RawTimeout::Text(text) => Timeout::Text(text),
        }
    }
}

impl Timeout {
    /// Normalizes the timeout.
    pub fn to_duration(&self) -> Result<Duration, TimeoutError> {
        match self {
            Timeout::Exact(duration) => Ok(*duration),
            Timeout::Seconds(secs) => from_secs(*secs),
            Timeout::Text(text) => {
                let text = text.trim();
                if let Ok(secs) = text.parse::<f64>() {
                    return from_secs(secs);
                }
                humantime::parse_duration(text).map_err(|err| TimeoutError {
                    value: text.to_owned(),
                    reason: format!("{err}"),
                })
            }
        }
    }
}

fn from_secs(secs: f64) -> Result<Duration, TimeoutError> {
    Duration::try_from_secs_f64(secs).map_err(|err| TimeoutError {
        value: secs.to_string(),
        reason: format!("{err}"),
    })
}

impl Default for Timeout {
    #[inline]
    fn default() -> Self {
        Timeout::Exact(DEFAULT_TIMEOUT)
    }
}

impl From<Duration> for Timeout {
    #[inline]
    fn from(duration: Duration) -> Self {
        Timeout::Exact(duration)
    }
}

impl From<u64> for Timeout {
    #[inline]
    fn from(secs: u64) -> Self {
        Timeout::Exact(Duration::from_secs(secs))
    }
}

impl From<u32> for Timeout {
    #[inline]
    fn from(secs: u32) -> Self {
        Timeout::Exact(Duration::from_secs(secs.into()))
    }
}

impl From<f64> for Timeout {
    #[inline]
    fn from(secs: f64) -> Self {
        Timeout::Seconds(secs)
    }
}

impl From<&str> for Timeout {
    #[inline]
    fn from(text: &str) -> Self {
        Timeout::Text(text.to_owned())
    }
}

impl From<String> for Timeout {
    #[inline]
    fn from(text: String) -> Self {
        Timeout::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_forms() {
        let expected = Duration::from_secs(30);
        assert_eq!(Timeout::from(30u64).to_duration().unwrap(), expected);
        assert_eq!(Timeout::from(30.0).to_duration().unwrap(), expected);
        assert_eq!(Timeout::from(expected).to_duration().unwrap(), expected);
        assert_eq!(Timeout::from("30").to_duration().unwrap(), expected);
        assert_eq!(Timeout::from("30s").to_duration().unwrap(), expected);
        assert_eq!(
            Timeout::from("1m 30s").to_duration().unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            Timeout::from(0.25).to_duration().unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(Timeout::default().to_duration().unwrap(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_reject_invalid() {
        assert!(Timeout::from(-1.0).to_duration().is_err());
        assert!(Timeout::from(f64::NAN).to_duration().is_err());
        assert!(Timeout::from("soon").to_duration().is_err());
    }

    #[test]
    fn test_deserialize() {
        let timeout: Timeout = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(timeout.to_duration().unwrap(), Duration::from_secs(5));

        let timeout: Timeout = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(timeout.to_duration().unwrap(), Duration::from_millis(1500));

        let timeout: Timeout = serde_json::from_value(json!("2m")).unwrap();
        assert_eq!(timeout.to_duration().unwrap(), Duration::from_secs(120));

        assert!(serde_json::from_value::<Timeout>(json!([1])).is_err());
    }
}
