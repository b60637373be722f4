use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// Where AWS credentials for a run come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    #[default]
    DefaultChain,
}

impl CredentialSource {
    /// Short description that never includes a secret.
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Inline {
                access_key_id,
                session_token,
                ..
            } => {
                let kind = if session_token.is_some() {
                    "temporary"
                } else {
                    "inline"
                };
                format!("{kind} ({})", redact_access_key(access_key_id))
            }
            CredentialSource::Profile { profile_name } => format!("profile {profile_name}"),
            CredentialSource::DefaultChain => "default chain".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub account_id: String,
    pub arn: String,
    pub user_id: String,
}

/// Build an `SdkConfig` from a region and credential source.
pub async fn build_sdk_config(region: &str, creds: &CredentialSource) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    match creds {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(aws_sdk_sts::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "reaper-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    builder.load().await
}

/// Call STS GetCallerIdentity. The returned ARN is the caller identity
/// recorded with each run.
pub async fn validate_credentials(
    config: &aws_config::SdkConfig,
) -> Result<CallerIdentity, ConnectError> {
    let sts = aws_sdk_sts::Client::new(config);
    let resp = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| ConnectError::Credentials(reaper_core::format_err_chain(&e)))?;

    Ok(CallerIdentity {
        account_id: resp.account().unwrap_or_default().to_string(),
        arn: resp.arn().unwrap_or_default().to_string(),
        user_id: resp.user_id().unwrap_or_default().to_string(),
    })
}

/// Keep the first four and last four characters of an access key.
pub fn redact_access_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
