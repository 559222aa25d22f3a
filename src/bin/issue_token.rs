use anyhow::Context;

use movie_reco_api::{
    config::Config,
    middleware::{JwtKeys, DEFAULT_TOKEN_TTL},
};

/// Prints a bearer token for the client named on the command line.
fn main() -> anyhow::Result<()> {
    let client = std::env::args()
        .nth(1)
        .context("usage: issue-token <client-name>")?;

    let config = Config::from_env()?;
    let token = JwtKeys::from_secret(&config.jwt_secret).issue_token(&client, DEFAULT_TOKEN_TTL)?;

    println!("{}", token);
    Ok(())
}
