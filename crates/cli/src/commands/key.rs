//! Access key commands

use super::Context;
use crate::output::{print_item, print_list, print_success, print_value, TableDisplay};
use anyhow::Result;
use clap::Subcommand;
use netmesh_common::AccessKey;
use netmesh_control::{AccessKeyRequest, Operation};
use serde::Serialize;

#[derive(Subcommand)]
pub enum KeyCommands {
    /// List access keys of a network
    List {
        /// Network ID
        network: String,
    },

    /// Create an access key; omitted fields are generated
    Create {
        /// Network ID
        network: String,

        #[arg(long, default_value = "")]
        name: String,

        /// Secret value (alphanumeric, at most 16 characters)
        #[arg(long, default_value = "")]
        value: String,

        #[arg(long, default_value = "0")]
        uses: i32,
    },

    /// Delete an access key
    Delete {
        /// Network ID
        network: String,

        /// Key name
        name: String,
    },

    /// Print a signup token for self-service enrollment
    SignupToken {
        /// Network ID
        network: String,
    },
}

#[derive(Serialize)]
pub struct KeyDisplay {
    #[serde(flatten)]
    key: AccessKey,
}

impl TableDisplay for KeyDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Value", "Uses", "Access String"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.key.name.clone(),
            self.key.value.clone(),
            self.key.uses.to_string(),
            self.key.access_string.clone(),
        ]
    }
}

pub async fn execute(cmd: KeyCommands, ctx: &Context) -> Result<()> {
    match cmd {
        KeyCommands::List { network } => {
            let scope = ctx.authorize(Operation::ListAccessKeys, Some(&network)).await?;
            let keys = ctx.plane.list_access_keys(&scope, &network).await?;
            let displays: Vec<KeyDisplay> = keys.into_iter().map(|key| KeyDisplay { key }).collect();
            print_list(&displays, ctx.format);
        }

        KeyCommands::Create {
            network,
            name,
            value,
            uses,
        } => {
            let scope = ctx.authorize(Operation::CreateAccessKey, Some(&network)).await?;
            let key = ctx
                .plane
                .create_access_key(&scope, &network, AccessKeyRequest { name, value, uses })
                .await?;
            print_success(&format!("Created access key {}", key.name));
            print_item(&KeyDisplay { key }, ctx.format);
        }

        KeyCommands::Delete { network, name } => {
            let scope = ctx.authorize(Operation::DeleteAccessKey, Some(&network)).await?;
            ctx.plane.delete_access_key(&scope, &network, &name).await?;
            print_success(&format!("Deleted access key {}", name));
        }

        KeyCommands::SignupToken { network } => {
            let scope = ctx.authorize(Operation::SignupToken, Some(&network)).await?;
            let token = ctx.plane.signup_token(&scope, &network).await?;
            print_value("accessstring", &token.access_string, ctx.format);
        }
    }

    Ok(())
}
