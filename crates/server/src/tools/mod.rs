//! Tools the agent can call
//!
//! The set is closed: every tool name the model may use maps to a
//! [`ToolKind`], and every kind has a typed argument struct. Anything else
//! is rejected with a [`ToolError`] that goes back to the model.

pub mod fhir;
pub mod search;

pub use fhir::{FhirClient, FhirPostError, PostReport};
pub use search::SearchEndpoints;

use async_trait::async_trait;
use fhir_synth_core::is_fhir_resource;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use crate::ai::{ToolCall, ToolSpec};

/// Longest tool output passed back to the model, in characters
const MAX_TOOL_OUTPUT: usize = 4000;

/// Failures while executing a tool call
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream service returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Could not read upstream response: {0}")]
    Parse(String),

    #[error("No FHIR endpoint given and FHIR_ENDPOINT is not configured")]
    NoEndpoint,

    #[error(transparent)]
    Fhir(#[from] FhirPostError),
}

/// Every tool the agent knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WebSearch,
    Encyclopedia,
    PubMed,
    Arxiv,
    FhirPost,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::WebSearch,
        ToolKind::Encyclopedia,
        ToolKind::PubMed,
        ToolKind::Arxiv,
        ToolKind::FhirPost,
    ];

    /// Function name advertised to the model
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::Encyclopedia => "encyclopedia_lookup",
            ToolKind::PubMed => "pubmed_search",
            ToolKind::Arxiv => "arxiv_search",
            ToolKind::FhirPost => "post_fhir_bundle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn spec(self) -> ToolSpec {
        let query_schema = |description: &str| {
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": description}
                },
                "required": ["query"],
                "additionalProperties": false
            })
        };

        let (description, parameters) = match self {
            ToolKind::WebSearch => (
                "Search the web (DuckDuckGo instant answers) for general or current information.",
                query_schema("Search terms"),
            ),
            ToolKind::Encyclopedia => (
                "Look up encyclopedia (Wikipedia) summaries of conditions, drugs and procedures.",
                query_schema("Topic to look up"),
            ),
            ToolKind::PubMed => (
                "Search PubMed for clinical and biomedical literature. Returns abstracts.",
                query_schema("PubMed search terms"),
            ),
            ToolKind::Arxiv => (
                "Search arXiv for scholarly articles on clinical conditions, methods or models.",
                query_schema("arXiv search terms"),
            ),
            ToolKind::FhirPost => (
                "POST a FHIR resource (usually a Bundle) to a FHIR server and report the response.",
                json!({
                    "type": "object",
                    "properties": {
                        "bundle": {
                            "type": "object",
                            "description": "The FHIR resource to send, with a resourceType"
                        },
                        "endpoint": {
                            "type": "string",
                            "description": "FHIR server URL; defaults to the configured endpoint"
                        }
                    },
                    "required": ["bundle"],
                    "additionalProperties": false
                }),
            ),
        };

        ToolSpec {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Arguments of the search tools
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

/// Arguments of the FHIR POST tool
#[derive(Debug, Clone, Deserialize)]
pub struct FhirPostArgs {
    /// The resource, either as a JSON object or as JSON text
    pub bundle: JsonValue,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// A validated tool call
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    WebSearch(SearchArgs),
    Encyclopedia(SearchArgs),
    PubMed(SearchArgs),
    Arxiv(SearchArgs),
    FhirPost(FhirPostArgs),
}

fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolError> {
    serde_json::from_str(&call.arguments).map_err(|e| ToolError::InvalidArguments {
        tool: call.name.clone(),
        reason: e.to_string(),
    })
}

fn search_args(call: &ToolCall) -> Result<SearchArgs, ToolError> {
    let args: SearchArgs = parse_args(call)?;
    if args.query.trim().is_empty() {
        return Err(ToolError::InvalidArguments {
            tool: call.name.clone(),
            reason: "query must not be empty".to_string(),
        });
    }
    Ok(args)
}

impl ToolInvocation {
    /// Resolve the tool name and parse its arguments
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let kind =
            ToolKind::from_name(&call.name).ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        Ok(match kind {
            ToolKind::WebSearch => ToolInvocation::WebSearch(search_args(call)?),
            ToolKind::Encyclopedia => ToolInvocation::Encyclopedia(search_args(call)?),
            ToolKind::PubMed => ToolInvocation::PubMed(search_args(call)?),
            ToolKind::Arxiv => ToolInvocation::Arxiv(search_args(call)?),
            ToolKind::FhirPost => ToolInvocation::FhirPost(parse_args(call)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::WebSearch(_) => ToolKind::WebSearch,
            ToolInvocation::Encyclopedia(_) => ToolKind::Encyclopedia,
            ToolInvocation::PubMed(_) => ToolKind::PubMed,
            ToolInvocation::Arxiv(_) => ToolKind::Arxiv,
            ToolInvocation::FhirPost(_) => ToolKind::FhirPost,
        }
    }
}

/// Per-run state shared with the tools of one interaction
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Endpoint the user asked for; used when a FHIR POST call names none
    pub fhir_endpoint: Option<String>,
    /// Every FHIR POST the tools made during the run
    pub posts: Vec<PostReport>,
}

impl ToolContext {
    pub fn new(fhir_endpoint: Option<&str>) -> Self {
        Self {
            fhir_endpoint: fhir_endpoint
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            posts: Vec::new(),
        }
    }
}

/// Executes tool calls requested by the model
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tools to advertise to the model
    fn specs(&self) -> Vec<ToolSpec>;

    async fn execute(&self, call: &ToolCall, ctx: &mut ToolContext) -> Result<String, ToolError>;
}

/// UTF-8 safe truncation to `max` characters
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The production tool set: web searches plus FHIR POST
#[derive(Clone)]
pub struct Toolbox {
    http: reqwest::Client,
    endpoints: SearchEndpoints,
    fhir: FhirClient,
    default_endpoint: Option<String>,
    kinds: Vec<ToolKind>,
}

impl Toolbox {
    pub fn new(
        http: reqwest::Client,
        endpoints: SearchEndpoints,
        fhir: FhirClient,
        default_endpoint: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoints,
            fhir,
            default_endpoint,
            kinds: ToolKind::ALL.to_vec(),
        }
    }

    /// Restrict the advertised tools
    pub fn with_kinds(mut self, kinds: &[ToolKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    async fn post_fhir(&self, args: FhirPostArgs, ctx: &mut ToolContext) -> Result<String, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: ToolKind::FhirPost.name().to_string(),
            reason,
        };

        let resource = match args.bundle {
            JsonValue::String(text) => serde_json::from_str::<JsonValue>(&text)
                .map_err(|e| invalid(format!("bundle is not valid JSON: {e}")))?,
            other => other,
        };
        if !is_fhir_resource(&resource) {
            return Err(invalid("bundle has no resourceType".to_string()));
        }

        let endpoint = args
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .or_else(|| ctx.fhir_endpoint.clone())
            .or_else(|| self.default_endpoint.clone())
            .ok_or(ToolError::NoEndpoint)?;

        let report = self.fhir.post(&endpoint, &resource).await?;
        let text = report.to_string();
        ctx.posts.push(report);
        Ok(text)
    }
}

#[async_trait]
impl ToolExecutor for Toolbox {
    fn specs(&self) -> Vec<ToolSpec> {
        self.kinds.iter().map(|kind| kind.spec()).collect()
    }

    async fn execute(&self, call: &ToolCall, ctx: &mut ToolContext) -> Result<String, ToolError> {
        let invocation = ToolInvocation::parse(call)?;
        if !self.kinds.contains(&invocation.kind()) {
            return Err(ToolError::UnknownTool(call.name.clone()));
        }

        let output = match invocation {
            ToolInvocation::WebSearch(args) => {
                search::duckduckgo(&self.http, &self.endpoints.duckduckgo, &args.query).await?
            }
            ToolInvocation::Encyclopedia(args) => {
                search::wikipedia(&self.http, &self.endpoints.wikipedia, &args.query).await?
            }
            ToolInvocation::PubMed(args) => {
                search::pubmed(&self.http, &self.endpoints.pubmed, &args.query).await?
            }
            ToolInvocation::Arxiv(args) => {
                search::arxiv(&self.http, &self.endpoints.arxiv, &args.query).await?
            }
            ToolInvocation::FhirPost(args) => self.post_fhir(args, ctx).await?,
        };

        Ok(truncate_chars(&output, MAX_TOOL_OUTPUT).to_string())
    }
}
