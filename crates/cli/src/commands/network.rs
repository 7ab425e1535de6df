//! Network commands

use super::{format_timestamp, Context};
use crate::output::{print_item, print_list, print_success, TableDisplay};
use anyhow::Result;
use clap::{Args, Subcommand};
use netmesh_common::{Network, NetworkPatch};
use netmesh_control::Operation;
use serde::Serialize;

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// List networks visible to the caller
    List,

    /// Show one network
    Get {
        /// Network ID
        id: String,
    },

    /// Create a network
    Create {
        /// Network ID (1-12 characters of [A-Za-z0-9-_.])
        id: String,

        /// IPv4 address range (CIDR)
        #[arg(long)]
        range: String,

        #[command(flatten)]
        fields: NetworkFields,
    },

    /// Update a network; only the given fields change
    Update {
        /// Network ID
        id: String,

        /// IPv4 address range (CIDR)
        #[arg(long)]
        range: Option<String>,

        #[command(flatten)]
        fields: NetworkFields,
    },

    /// Set the maximum number of nodes (0 restores the default)
    NodeLimit {
        /// Network ID
        id: String,

        limit: i32,
    },

    /// Delete a network without nodes
    Delete {
        /// Network ID
        id: String,
    },

    /// Tell nodes to rotate their keys
    KeyUpdate {
        /// Network ID
        id: String,
    },

    /// Tell nodes to pull fresh configuration
    Alert {
        /// Network ID
        id: String,
    },
}

/// Optional network fields shared by create and update
#[derive(Args)]
pub struct NetworkFields {
    /// Display name (unique)
    #[arg(long)]
    display_name: Option<String>,

    /// IPv6 address range (CIDR), used when dual-stack
    #[arg(long)]
    range6: Option<String>,

    /// Local address range (CIDR), used when local
    #[arg(long)]
    local_range: Option<String>,

    #[arg(long)]
    local: Option<bool>,

    #[arg(long)]
    dual_stack: Option<bool>,

    #[arg(long)]
    manual_signup: Option<bool>,

    /// Default interface name for nodes
    #[arg(long)]
    interface: Option<String>,

    #[arg(long)]
    listen_port: Option<i32>,

    #[arg(long)]
    keepalive: Option<i32>,

    #[arg(long)]
    check_in_interval: Option<i32>,

    #[arg(long)]
    post_up: Option<String>,

    #[arg(long)]
    post_down: Option<String>,
}

impl NetworkFields {
    fn into_patch(self, range: Option<String>) -> NetworkPatch {
        NetworkPatch {
            display_name: self.display_name.unwrap_or_default(),
            address_range: range.unwrap_or_default(),
            address_range6: self.range6.unwrap_or_default(),
            local_range: self.local_range.unwrap_or_default(),
            is_local: self.local,
            is_dual_stack: self.dual_stack,
            allow_manual_signup: self.manual_signup,
            default_interface: self.interface.unwrap_or_default(),
            default_listen_port: self.listen_port.unwrap_or_default(),
            default_post_up: self.post_up.unwrap_or_default(),
            default_post_down: self.post_down.unwrap_or_default(),
            default_keepalive: self.keepalive.unwrap_or_default(),
            default_check_in_interval: self.check_in_interval.unwrap_or_default(),
            ..Default::default()
        }
    }

    fn into_network(self, id: String, range: String) -> Network {
        let patch = self.into_patch(Some(range));
        Network {
            net_id: id,
            display_name: patch.display_name,
            address_range: patch.address_range,
            address_range6: patch.address_range6,
            local_range: patch.local_range,
            is_local: patch.is_local,
            is_dual_stack: patch.is_dual_stack,
            allow_manual_signup: patch.allow_manual_signup,
            default_interface: patch.default_interface,
            default_listen_port: patch.default_listen_port,
            default_post_up: patch.default_post_up,
            default_post_down: patch.default_post_down,
            default_keepalive: patch.default_keepalive,
            default_check_in_interval: patch.default_check_in_interval,
            ..Default::default()
        }
    }
}

/// Network display wrapper for serialization
#[derive(Serialize)]
pub struct NetworkDisplay {
    #[serde(flatten)]
    network: Network,
}

impl From<Network> for NetworkDisplay {
    fn from(network: Network) -> Self {
        Self { network }
    }
}

impl TableDisplay for NetworkDisplay {
    fn headers() -> Vec<&'static str> {
        vec![
            "NetID",
            "Display Name",
            "Range",
            "Range6",
            "Local Range",
            "Port",
            "Node Limit",
            "Keys",
            "Modified",
        ]
    }

    fn row(&self) -> Vec<String> {
        let n = &self.network;
        vec![
            n.net_id.clone(),
            n.display_name.clone(),
            n.address_range.clone(),
            n.address_range6.clone(),
            if n.is_local() { n.local_range.clone() } else { String::new() },
            n.default_listen_port.to_string(),
            n.node_limit.to_string(),
            n.access_keys.len().to_string(),
            format_timestamp(n.network_last_modified),
        ]
    }
}

pub async fn execute(cmd: NetworkCommands, ctx: &Context) -> Result<()> {
    match cmd {
        NetworkCommands::List => {
            let scope = ctx.authorize(Operation::ListNetworks, None).await?;
            let networks = ctx.plane.list_networks(&scope).await?;
            let displays: Vec<NetworkDisplay> = networks.into_iter().map(NetworkDisplay::from).collect();
            print_list(&displays, ctx.format);
        }

        NetworkCommands::Get { id } => {
            let scope = ctx.authorize(Operation::GetNetwork, Some(&id)).await?;
            let network = ctx.plane.get_network(&scope, &id).await?;
            print_item(&NetworkDisplay::from(network), ctx.format);
        }

        NetworkCommands::Create { id, range, fields } => {
            let scope = ctx.authorize(Operation::CreateNetwork, None).await?;
            let network = fields.into_network(id, range);
            let created = ctx.plane.create_network(&scope, network).await?;
            print_success(&format!("Created network {}", created.net_id));
            print_item(&NetworkDisplay::from(created), ctx.format);
        }

        NetworkCommands::Update { id, range, fields } => {
            let scope = ctx.authorize(Operation::UpdateNetwork, Some(&id)).await?;
            let patch = fields.into_patch(range);
            let updated = ctx.plane.update_network(&scope, &id, &patch).await?;
            print_success(&format!("Updated network {}", id));
            print_item(&NetworkDisplay::from(updated), ctx.format);
        }

        NetworkCommands::NodeLimit { id, limit } => {
            let scope = ctx.authorize(Operation::UpdateNodeLimit, Some(&id)).await?;
            let updated = ctx.plane.update_node_limit(&scope, &id, limit).await?;
            print_success(&format!("Node limit of {} is now {}", id, updated.node_limit));
        }

        NetworkCommands::Delete { id } => {
            let scope = ctx.authorize(Operation::DeleteNetwork, Some(&id)).await?;
            ctx.plane.delete_network(&scope, &id).await?;
            print_success(&format!("Deleted network {}", id));
        }

        NetworkCommands::KeyUpdate { id } => {
            let scope = ctx.authorize(Operation::KeyUpdate, Some(&id)).await?;
            ctx.plane.key_update(&scope, &id).await?;
            print_success(&format!("Requested key update on {}", id));
        }

        NetworkCommands::Alert { id } => {
            let scope = ctx.authorize(Operation::AlertNetwork, Some(&id)).await?;
            ctx.plane.alert_network(&scope, &id).await?;
            print_success(&format!("Alerted nodes of {}", id));
        }
    }

    Ok(())
}
