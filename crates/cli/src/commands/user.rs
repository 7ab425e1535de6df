//! User token commands

use super::Context;
use crate::output::print_value;
use anyhow::Result;
use clap::Subcommand;
use netmesh_control::Operation;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Sign a user token (operator only)
    Token {
        /// Username carried by the token
        username: String,

        /// Network the user may access; repeat for several
        #[arg(long = "network")]
        networks: Vec<String>,

        /// Grant unrestricted access
        #[arg(long)]
        admin: bool,
    },
}

pub async fn execute(cmd: UserCommands, ctx: &Context) -> Result<()> {
    match cmd {
        UserCommands::Token {
            username,
            networks,
            admin,
        } => {
            let scope = ctx.authorize(Operation::IssueUserToken, None).await?;
            let token = ctx
                .plane
                .issue_user_token(&scope, &username, &networks, admin)?;
            print_value("token", &token, ctx.format);
        }
    }

    Ok(())
}
