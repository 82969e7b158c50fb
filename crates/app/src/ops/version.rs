use clap::Args;

use crate::version::build_info;

#[derive(Args, Debug, Clone)]
pub struct Version {
    /// Output build metadata as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("failed to serialize build info: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Version {
    type Error = VersionError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let info = build_info();
        if self.json {
            return Ok(serde_json::to_string_pretty(&info)?);
        }
        Ok(info.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};

    #[tokio::test]
    async fn test_version_json_carries_build_metadata() {
        let ctx = OpContext::new(None);
        let output = Version { json: true }.execute(&ctx).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert!(value["build_timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_version_text_mentions_build_time() {
        let ctx = OpContext::new(None);
        let output = Version { json: false }.execute(&ctx).await.unwrap();
        assert!(output.starts_with("nfsrods "));
        assert!(output.contains(env!("BUILD_TIMESTAMP")));
    }
}
