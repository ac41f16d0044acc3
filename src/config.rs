use serde::Deserialize;

/// Engine-wide settings.
///
/// Every field has a default, so a partial document deserializes cleanly:
///
/// ```
/// use authflow_engine::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "max_accept_loops": 10 }"#).unwrap();
/// assert_eq!(config.max_accept_loops, 10);
/// assert_eq!(config.instance_id_prefix, "flow_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on reactor resolutions within one `accept` call.
    /// Exceeding it means some reactor keeps appending nodes forever.
    pub max_accept_loops: usize,
    /// Prefix of the stable workflow ID.
    pub workflow_id_prefix: String,
    /// Prefix of the per-snapshot instance ID.
    pub instance_id_prefix: String,
    /// Prefix of user agent IDs.
    pub user_agent_id_prefix: String,
    /// Number of random characters after the prefix.
    pub id_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_accept_loops: 100,
            workflow_id_prefix: "flowparent_".to_string(),
            instance_id_prefix: "flow_".to_string(),
            user_agent_id_prefix: "ua_".to_string(),
            id_length: 32,
        }
    }
}
