use layerpack_cloud::{AwsClient, AwsSession};

use super::ConfigArgs;

/// Show which AWS identity the configured credentials resolve to.
pub async fn whoami(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = args.load()?;
    let session = AwsSession::from_env(&config.layer.region)?;
    let static_credentials = session.has_static_credentials();

    let client = AwsClient::new(session);
    let identity = client.caller_identity().await?;

    println!("Account:     {}", identity.account);
    println!("User ID:     {}", identity.user_id);
    println!("ARN:         {}", identity.arn);
    println!("Region:      {}", config.layer.region);
    println!(
        "Credentials: {}",
        if static_credentials {
            "environment"
        } else {
            "aws CLI default chain"
        }
    );
    Ok(())
}
