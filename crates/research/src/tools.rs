//! `search_papers` and `extract_info` as local tools.

use std::sync::Arc;

use runtime::{Arguments, LocalHandler, LocalTool, ToolDescriptor, ToolError, ToolFuture, ToolRegistry};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;

use crate::arxiv::ArxivClient;
use crate::index::PaperIndex;

pub const SEARCH_PAPERS: &str = "search_papers";
pub const EXTRACT_INFO: &str = "extract_info";

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Settings shared by the research tools.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub max_results: usize,
    pub api_url: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            api_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    topic: String,
    // Models send integers as floats often enough.
    #[serde(default)]
    max_results: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExtractArgs {
    paper_id: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Arguments) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::InvalidArguments(format!("{tool}: {e}")))
}

/// Searches arXiv and remembers what it found.
pub struct SearchPapers {
    client: ArxivClient,
    index: Arc<PaperIndex>,
    default_max_results: usize,
}

impl SearchPapers {
    pub fn new(client: ArxivClient, index: Arc<PaperIndex>, default_max_results: usize) -> Self {
        Self {
            client,
            index,
            default_max_results,
        }
    }

    pub fn descriptor() -> Result<ToolDescriptor, ToolError> {
        ToolDescriptor::new(
            SEARCH_PAPERS,
            "Search for papers on arXiv",
            json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "The topic to search for"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to retrieve",
                        "default": DEFAULT_MAX_RESULTS
                    }
                },
                "required": ["topic"]
            }),
        )
    }
}

impl LocalTool for SearchPapers {
    fn call(&self, arguments: Arguments) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: SearchArgs = parse_args(SEARCH_PAPERS, arguments)?;
            let max_results = args
                .max_results
                .map_or(self.default_max_results, |n| n.max(1.0) as usize);

            let papers = self
                .client
                .search(&args.topic, max_results)
                .await
                .map_err(|e| ToolError::Execution(e.to_string()))?;

            let ids = self.index.insert_all(papers).await;
            info!(topic = %args.topic, found = ids.len(), "stored search results");
            Ok(Value::from(ids))
        })
    }
}

/// Looks up a paper stored by an earlier search.
pub struct ExtractInfo {
    index: Arc<PaperIndex>,
}

impl ExtractInfo {
    pub fn new(index: Arc<PaperIndex>) -> Self {
        Self { index }
    }

    pub fn descriptor() -> Result<ToolDescriptor, ToolError> {
        ToolDescriptor::new(
            EXTRACT_INFO,
            "Search for information about a specific paper.",
            json!({
                "type": "object",
                "properties": {
                    "paper_id": {
                        "type": "string",
                        "description": "The ID of the paper to look for."
                    }
                },
                "required": ["paper_id"]
            }),
        )
    }
}

impl LocalTool for ExtractInfo {
    fn call(&self, arguments: Arguments) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: ExtractArgs = parse_args(EXTRACT_INFO, arguments)?;
            match self.index.get(&args.paper_id).await {
                Some(paper) => serde_json::to_value(paper)
                    .map_err(|e| ToolError::Execution(e.to_string())),
                None => Ok(Value::String(format!(
                    "There's no saved information related to paper {}.",
                    args.paper_id
                ))),
            }
        })
    }
}

/// Register both research tools over a fresh index; returns the index.
pub fn register_all(
    registry: &mut ToolRegistry,
    config: &ResearchConfig,
) -> Result<Arc<PaperIndex>, ToolError> {
    let index = Arc::new(PaperIndex::new());
    let client = config
        .api_url
        .as_deref()
        .map_or_else(ArxivClient::default, ArxivClient::new);

    registry.register(
        SearchPapers::descriptor()?,
        LocalHandler::new(SearchPapers::new(client, index.clone(), config.max_results)),
    );
    registry.register(
        ExtractInfo::descriptor()?,
        LocalHandler::new(ExtractInfo::new(index.clone())),
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arxiv::{parse_feed, tests::FEED};
    use runtime::{FunctionCallIntent, ToolResult, invoke};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    /// Serve `FEED` once over plain HTTP; returns the API URL.
    async fn serve_feed() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/atom+xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                FEED.len(),
                FEED
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/api/query")
    }

    #[test]
    fn descriptors_are_valid() {
        let search = SearchPapers::descriptor().unwrap();
        assert_eq!(search.required(), vec!["topic"]);
        let extract = ExtractInfo::descriptor().unwrap();
        assert_eq!(extract.required(), vec!["paper_id"]);
    }

    #[tokio::test]
    async fn extract_info_returns_stored_record() {
        let index = Arc::new(PaperIndex::new());
        index.insert_all(parse_feed(FEED).unwrap()).await;
        let tool = ExtractInfo::new(index);

        let value = tool.call(args(json!({"paper_id": "1310.7911v2"}))).await.unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "authors", "summary", "pdf_url", "published"]);
        assert_eq!(value["published"], "2013-10-29");
    }

    #[tokio::test]
    async fn extract_info_unknown_paper_is_a_message() {
        let tool = ExtractInfo::new(Arc::new(PaperIndex::new()));
        let value = tool.call(args(json!({"paper_id": "42"}))).await.unwrap();
        assert_eq!(value, json!("There's no saved information related to paper 42."));
    }

    #[tokio::test]
    async fn missing_argument_is_rejected() {
        let tool = ExtractInfo::new(Arc::new(PaperIndex::new()));
        let err = tool.call(Arguments::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref m) if m.contains("paper_id")));
    }

    #[tokio::test]
    async fn search_then_extract_through_registry() {
        let config = ResearchConfig {
            max_results: 2,
            api_url: Some(serve_feed().await),
        };
        let mut registry = ToolRegistry::new();
        let index = register_all(&mut registry, &config).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![SEARCH_PAPERS, EXTRACT_INFO]);

        let search = FunctionCallIntent::new(SEARCH_PAPERS, args(json!({"topic": "computers"})));
        let result = invoke(&search, &registry).await.unwrap();
        assert_eq!(result, ToolResult::Text("1310.7911v2,2001.00001v1".into()));
        assert_eq!(index.len().await, 2);

        let extract = FunctionCallIntent::new(EXTRACT_INFO, args(json!({"paper_id": "2001.00001v1"})));
        let text = invoke(&extract, &registry).await.unwrap().to_string();
        assert!(text.contains("\"title\": \"Second\""), "{text}");
    }

    #[tokio::test]
    async fn unreachable_api_becomes_tool_text() {
        let config = ResearchConfig {
            max_results: 1,
            api_url: Some("http://127.0.0.1:1/api/query".into()),
        };
        let mut registry = ToolRegistry::new();
        register_all(&mut registry, &config).unwrap();

        let search = FunctionCallIntent::new(SEARCH_PAPERS, args(json!({"topic": "x"})));
        let text = invoke(&search, &registry).await.unwrap().to_string();
        assert!(text.starts_with("Error executing search_papers:"), "{text}");
    }
}
