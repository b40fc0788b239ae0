//! Represents the configuration for a target connection.
///
/// This struct stores the connection details used to reach the target over
/// SSH: address, port, credentials, and retry/timeout behavior.
///
/// # Fields
///
/// - `ip`: A string representing the IP address or host name.
/// - `port`: An unsigned 16-bit integer representing the port number.
/// - `username`: A string representing the username.
/// - `password`: An optional string representing the password.
/// - `private_key_path`: An optional string representing the path to the private key file.
/// - `public_key_path`: An optional string representing the path to the public key file.
/// - `max_retries`: The maximum number of connection retry attempts.
/// - `timeout`: The connection timeout, parsed from a humantime string.
///
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_max_retries() -> u8 {
    3
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 22,
            username: "root".to_string(),
            password: None,
            private_key_path: None,
            public_key_path: None,
            max_retries: 3,
            timeout: Duration::from_secs(15),
        }
    }
}
