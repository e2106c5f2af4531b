use omniverse_core::PublicKey;
use tracing::debug;

use crate::error::CliError;

/// Query string of a faucet request; `pallet` and `itemId` are only sent
/// for non-fungible items
pub fn faucet_query(
    public_key: &PublicKey,
    asset_id: &str,
    pallet: &str,
    item_id: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("publicKey", public_key.to_hex()),
        ("tokenId", asset_id.to_string()),
    ];
    if let Some(item_id) = item_id {
        query.push(("pallet", pallet.to_string()));
        query.push(("itemId", item_id.to_string()));
    }
    query
}

/// Ask the chain's faucet for tokens; the response body is returned as-is
pub async fn request_tokens(
    faucet_url: &str,
    public_key: &PublicKey,
    asset_id: &str,
    pallet: &str,
    item_id: Option<&str>,
) -> Result<String, CliError> {
    if faucet_url.is_empty() {
        return Err(CliError::Config("faucet service not configured for this chain".to_string()));
    }

    let url = format!("{}/get_token", faucet_url.trim_end_matches('/'));
    debug!("Requesting {} from {}", asset_id, url);

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .query(&faucet_query(public_key, asset_id, pallet, item_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(CliError::Network(format!("faucet returned {}", response.status())));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::KeyPair;

    #[test]
    fn test_query_fungible() {
        let kp = KeyPair::generate();
        let query = faucet_query(&kp.public, "TKN1", "assets", None);
        assert_eq!(query.len(), 2);
        assert_eq!(query[0], ("publicKey", kp.public.to_hex()));
        assert_eq!(query[1], ("tokenId", "TKN1".to_string()));
    }

    #[test]
    fn test_query_item() {
        let kp = KeyPair::generate();
        let query = faucet_query(&kp.public, "NFT1", "uniques", Some("3"));
        assert_eq!(query[2], ("pallet", "uniques".to_string()));
        assert_eq!(query[3], ("itemId", "3".to_string()));
    }

    #[tokio::test]
    async fn test_empty_url_is_config_error() {
        let kp = KeyPair::generate();
        let err = request_tokens("", &kp.public, "TKN1", "assets", None).await.unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
