use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const TOOL_DEVELOP_AND_CREATE_PROJECT: &str = "develop_and_create_project";
pub const TOOL_CREATE_NOTION_PROJECT_PAGE: &str = "create_notion_project_page";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";
pub const METHOD_INITIALIZE: &str = "initialize";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "projdev";

fn sanitize_tool_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

pub fn exported_tool_name(canonical: &str) -> String {
    sanitize_tool_name(canonical)
}

/// Resolve a client-supplied tool name to its canonical form. Names are
/// matched case-insensitively, with `-`, `.` and spaces treated as `_`.
pub fn canonical_tool_name(name: &str) -> Option<&'static str> {
    const CANONICAL: [&str; 2] = [
        TOOL_DEVELOP_AND_CREATE_PROJECT,
        TOOL_CREATE_NOTION_PROJECT_PAGE,
    ];
    let folded: String = sanitize_tool_name(name.trim())
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect();
    CANONICAL
        .into_iter()
        .find(|canonical| *canonical == name || *canonical == folded)
}

fn default_true() -> bool {
    true
}

/// Arguments of `develop_and_create_project`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct DevelopParams {
    /// The initial project idea to develop.
    pub idea: String,
    /// Name for the GitHub repository.
    pub project_name: String,
    /// Whether to also create a Notion project page.
    #[serde(default = "default_true")]
    pub create_notion_page: bool,
}

/// Arguments of `create_notion_project_page`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct NotionPageParams {
    /// The project idea shown on the page.
    pub idea: String,
    /// Page title.
    pub project_name: String,
    /// Repository linked from the page.
    pub github_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Option<serde_json::Value>,
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub struct ListToolsParams {
    #[serde(rename = "cursor", default)]
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,
    #[serde(
        rename = "nextCursor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct CallToolParams {
    #[serde(rename = "toolName", alias = "name")]
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: serde_json::Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exported_tool_name_keeps_snake_case_names() {
        assert_eq!(
            exported_tool_name(TOOL_DEVELOP_AND_CREATE_PROJECT),
            "develop_and_create_project"
        );
    }

    #[test]
    fn canonical_tool_name_folds_case_and_separators() {
        assert_eq!(
            canonical_tool_name("Develop-And-Create-Project"),
            Some(TOOL_DEVELOP_AND_CREATE_PROJECT)
        );
        assert_eq!(
            canonical_tool_name("create.notion.project.page"),
            Some(TOOL_CREATE_NOTION_PROJECT_PAGE)
        );
        assert_eq!(canonical_tool_name("delete_repository"), None);
    }

    #[test]
    fn develop_params_default_to_creating_page() {
        let params: DevelopParams =
            serde_json::from_value(json!({"idea": "x", "project_name": "y"})).unwrap();
        assert!(params.create_notion_page);

        let params: DevelopParams = serde_json::from_value(
            json!({"idea": "x", "project_name": "y", "create_notion_page": false}),
        )
        .unwrap();
        assert!(!params.create_notion_page);
    }

    #[test]
    fn develop_schema_requires_idea_and_name_only() {
        let schema = schemars::schema_for!(DevelopParams);
        let object = schema
            .schema
            .object
            .as_ref()
            .expect("expected object validation for DevelopParams");
        assert!(object.required.contains("idea"));
        assert!(object.required.contains("project_name"));
        assert!(!object.required.contains("create_notion_page"));
        assert!(object.properties.contains_key("create_notion_page"));
    }

    #[test]
    fn call_tool_params_accept_name_alias() {
        let params: CallToolParams = serde_json::from_value(json!({
            "name": "develop_and_create_project",
            "arguments": {"idea": "x"}
        }))
        .unwrap();
        assert_eq!(params.tool_name, TOOL_DEVELOP_AND_CREATE_PROJECT);
    }
}
