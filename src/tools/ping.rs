use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::NetdashConfig;
use crate::error::{NetdashError, Result};

/// Run the system ping binary against `host` and return its stdout.
///
/// The whole invocation is bounded by the configured timeout; on expiry
/// the child is killed and the caller sees a timeout error instead of a
/// hung request.
pub async fn run(host: &str, config: &NetdashConfig) -> Result<String> {
    let mut command = ping_command(host, config.ping_count);
    debug!("pinging {host}");

    let output = match timeout(config.ping_timeout(), command.output()).await {
        Ok(result) => result?,
        Err(_) => return Err(NetdashError::PingTimeout(host.to_string())),
    };

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            "Ping failed. Host may be unreachable or invalid.".to_string()
        } else {
            stderr.into_owned()
        };
        Err(NetdashError::CommandFailed(message))
    }
}

/// The count flag differs between the Windows and Unix ping binaries.
fn ping_command(host: &str, count: u32) -> Command {
    let mut command = Command::new("ping");
    if cfg!(target_os = "windows") {
        command.arg("-n");
    } else {
        command.arg("-c");
    }
    command.arg(count.to_string()).arg(host);
    command.stdin(Stdio::null());
    command.kill_on_drop(true);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn unix_ping_uses_dash_c() {
        let command = ping_command("example.com", 4);
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-c", "4", "example.com"]);
    }

    #[test]
    #[cfg(target_os = "windows")]
    fn windows_ping_uses_dash_n() {
        let command = ping_command("example.com", 4);
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-n", "4", "example.com"]);
    }
}
