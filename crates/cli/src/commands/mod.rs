//! netmeshctl commands

pub mod key;
pub mod network;
pub mod node;
pub mod user;

use crate::output::OutputFormat;
use anyhow::Result;
use netmesh_control::{AuthorizedScope, ControlPlane, Operation};

/// Everything a command needs to run
pub struct Context {
    pub plane: ControlPlane,
    pub credential: String,
    pub format: OutputFormat,
}

impl Context {
    /// Authorize the configured credential for `operation`
    pub async fn authorize(&self, operation: Operation, target: Option<&str>) -> Result<AuthorizedScope> {
        Ok(self.plane.authorize(operation, target, &self.credential).await?)
    }
}

/// Render a unix timestamp for tables
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
