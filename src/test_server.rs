//! Test-server spawner glue.
//!
//! Some network test suites expect a host-side test server they can
//! reach from the device. This module reserves a host port for the
//! spawner, forwards it back from the device, publishes its location in
//! the config file the suites read, and hands back a handle that keeps
//! the port and the tunnel alive until the run finishes.

use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;
use std::net::TcpListener;

use crate::target::{PortForward, TargetHandle};

/// Device path of the config file network test suites read.
const TEST_SERVER_CONFIG_PATH: &str = "/tmp/net-test-server-config";

/// A running test-server spawner.
///
/// Holds the listener so the reserved port stays bound, and the reverse
/// tunnel so the device can reach it.
pub struct TestServer {
    port: u16,
    listener: TcpListener,
    forward: PortForward,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn stop(self) -> Result<()> {
        info!("Stopping test server spawner on port {}", self.port);
        self.forward.stop()?;
        drop(self.listener);
        Ok(())
    }
}

/// Reserves a spawner port sized for `concurrency` parallel jobs,
/// forwards it from the device, and publishes its config scoped to the
/// test package.
pub fn setup_test_server(
    target: &TargetHandle,
    concurrency: u32,
    package_name: &str,
    test_realms: &[String],
) -> Result<TestServer> {
    // Bind to an ephemeral port and keep the listener so nothing else
    // on the host claims it while tests run.
    let listener =
        TcpListener::bind("127.0.0.1:0").with_context(|| "Unable to reserve a spawner port")?;
    let port = listener.local_addr()?.port();
    debug!("Test server spawner on port {port}, concurrency {concurrency}");

    let forward = target
        .borrow()
        .forward_remote_port(port, port)
        .with_context(|| "Unable to forward the spawner port from the device")?;

    let mut config_file = tempfile::NamedTempFile::new()?;
    write!(
        config_file,
        "{{\"spawner_url_base\": \"http://localhost:{port}\", \"concurrency\": {concurrency}}}"
    )?;
    config_file.flush()?;

    target
        .borrow()
        .put_file(
            config_file.path(),
            TEST_SERVER_CONFIG_PATH,
            Some(package_name.to_string()),
            Some(test_realms.to_vec()),
        )
        .with_context(|| "Unable to publish test server config to the device")?;

    info!("Test server ready on port {port}");
    Ok(TestServer {
        port,
        listener,
        forward,
    })
}
