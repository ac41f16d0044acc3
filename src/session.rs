use serde::{Deserialize, Serialize};

/// Caller-supplied context a flow is started with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub client_id: String,
    pub redirect_uri: String,
    pub suppress_idp_session_cookie: bool,
    pub state: String,
    pub x_state: String,
    pub ui_locales: String,
    pub user_agent_id: String,
}

fn merge_string(target: &mut String, overlay: &str) {
    if !overlay.is_empty() {
        *target = overlay.to_string();
    }
}

impl SessionOptions {
    /// Overlays the non-empty fields of `overlay` on a copy of `self`.
    ///
    /// Empty strings and `false` never overwrite, so a flag already set
    /// stays set.
    ///
    /// ```
    /// use authflow_engine::SessionOptions;
    ///
    /// let base = SessionOptions {
    ///     client_id: "portal".into(),
    ///     redirect_uri: "https://a.example/cb".into(),
    ///     ..Default::default()
    /// };
    /// let overlay = SessionOptions {
    ///     redirect_uri: "https://b.example/cb".into(),
    ///     ..Default::default()
    /// };
    ///
    /// let merged = base.partially_merge_from(Some(&overlay));
    /// assert_eq!(merged.client_id, "portal");
    /// assert_eq!(merged.redirect_uri, "https://b.example/cb");
    /// assert_eq!(base.partially_merge_from(None), base);
    /// ```
    pub fn partially_merge_from(&self, overlay: Option<&SessionOptions>) -> SessionOptions {
        let mut merged = self.clone();
        let Some(overlay) = overlay else {
            return merged;
        };

        merge_string(&mut merged.client_id, &overlay.client_id);
        merge_string(&mut merged.redirect_uri, &overlay.redirect_uri);
        if overlay.suppress_idp_session_cookie {
            merged.suppress_idp_session_cookie = true;
        }
        merge_string(&mut merged.state, &overlay.state);
        merge_string(&mut merged.x_state, &overlay.x_state);
        merge_string(&mut merged.ui_locales, &overlay.ui_locales);
        merge_string(&mut merged.user_agent_id, &overlay.user_agent_id);
        merged
    }
}

/// Per-flow bookkeeping keyed by the workflow ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub workflow_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub suppress_idp_session_cookie: bool,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub x_state: String,
    #[serde(default)]
    pub ui_locales: String,
    #[serde(default)]
    pub user_agent_id: String,
}

impl Session {
    pub fn new(workflow_id: String, options: &SessionOptions) -> Self {
        Self {
            workflow_id,
            client_id: options.client_id.clone(),
            redirect_uri: options.redirect_uri.clone(),
            suppress_idp_session_cookie: options.suppress_idp_session_cookie,
            state: options.state.clone(),
            x_state: options.x_state.clone(),
            ui_locales: options.ui_locales.clone(),
            user_agent_id: options.user_agent_id.clone(),
        }
    }

    /// The options the session was created with.
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            suppress_idp_session_cookie: self.suppress_idp_session_cookie,
            state: self.state.clone(),
            x_state: self.x_state.clone(),
            ui_locales: self.ui_locales.clone(),
            user_agent_id: self.user_agent_id.clone(),
        }
    }

    pub fn to_output(&self) -> SessionOutput {
        SessionOutput {
            workflow_id: self.workflow_id.clone(),
            client_id: self.client_id.clone(),
        }
    }
}

/// The part of a session shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutput {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_id: String,
}
