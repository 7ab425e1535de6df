//! Node commands

use super::{format_timestamp, Context};
use crate::output::{print_item, print_list, print_success, TableDisplay};
use anyhow::Result;
use clap::Subcommand;
use netmesh_common::Node;
use netmesh_control::Operation;
use serde::Serialize;

#[derive(Subcommand)]
pub enum NodeCommands {
    /// List nodes of a network
    List {
        /// Network ID
        network: String,
    },

    /// Enroll a node
    Add {
        /// Network ID
        network: String,

        /// Node name
        name: String,
    },

    /// Remove a node
    Remove {
        /// Network ID
        network: String,

        /// Node ID
        id: String,
    },
}

#[derive(Serialize)]
pub struct NodeDisplay {
    #[serde(flatten)]
    node: Node,
}

impl TableDisplay for NodeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Address", "Address6", "Local Address", "Modified"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.node.id.clone(),
            self.node.name.clone(),
            self.node.address.clone(),
            self.node.address6.clone(),
            self.node.local_address.clone(),
            format_timestamp(self.node.last_modified),
        ]
    }
}

pub async fn execute(cmd: NodeCommands, ctx: &Context) -> Result<()> {
    match cmd {
        NodeCommands::List { network } => {
            let scope = ctx.authorize(Operation::ManageNodes, Some(&network)).await?;
            let nodes = ctx.plane.list_nodes(&scope, &network).await?;
            let displays: Vec<NodeDisplay> = nodes.into_iter().map(|node| NodeDisplay { node }).collect();
            print_list(&displays, ctx.format);
        }

        NodeCommands::Add { network, name } => {
            let scope = ctx.authorize(Operation::ManageNodes, Some(&network)).await?;
            let node = ctx.plane.add_node(&scope, &network, &name).await?;
            print_success(&format!("Added node {} at {}", node.name, node.address));
            print_item(&NodeDisplay { node }, ctx.format);
        }

        NodeCommands::Remove { network, id } => {
            let scope = ctx.authorize(Operation::ManageNodes, Some(&network)).await?;
            ctx.plane.remove_node(&scope, &network, &id).await?;
            print_success(&format!("Removed node {}", id));
        }
    }

    Ok(())
}
