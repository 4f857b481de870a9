//! Search tools: DuckDuckGo, Wikipedia, PubMed and arXiv

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{ToolError, truncate_chars};

/// Results requested from each literature source
const MAX_RESULTS: usize = 3;
const MAX_RELATED_TOPICS: usize = 5;

/// Base URLs of the search services
#[derive(Debug, Clone)]
pub struct SearchEndpoints {
    pub duckduckgo: String,
    pub wikipedia: String,
    /// E-utilities root; `esearch.fcgi` and `efetch.fcgi` are appended
    pub pubmed: String,
    pub arxiv: String,
}

impl Default for SearchEndpoints {
    fn default() -> Self {
        Self {
            duckduckgo: "https://api.duckduckgo.com/".to_string(),
            wikipedia: "https://en.wikipedia.org/w/api.php".to_string(),
            pubmed: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            arxiv: "https://export.arxiv.org/api/query".to_string(),
        }
    }
}

async fn get_text(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String, ToolError> {
    let response = http.get(url).query(params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ToolError::Upstream {
            status: status.as_u16(),
            body: truncate_chars(&body, 300).to_string(),
        });
    }
    Ok(body)
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, ToolError> {
    let body = get_text(http, url, params).await?;
    serde_json::from_str(&body).map_err(|e| ToolError::Parse(e.to_string()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
    /// Topic groups nest further topics
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

fn flatten_topics<'a>(topics: &'a [RelatedTopic], out: &mut Vec<&'a str>) {
    for topic in topics {
        if let Some(text) = topic.text.as_deref().filter(|t| !t.is_empty()) {
            out.push(text);
        }
        flatten_topics(&topic.topics, out);
    }
}

/// DuckDuckGo instant answer lookup
pub async fn duckduckgo(
    http: &reqwest::Client,
    base: &str,
    query: &str,
) -> Result<String, ToolError> {
    let answer: InstantAnswer = get_json(
        http,
        base,
        &[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ],
    )
    .await?;

    let mut sections = Vec::new();
    if !answer.abstract_text.is_empty() {
        let mut summary = format!("{}: {}", answer.heading, answer.abstract_text);
        if !answer.abstract_url.is_empty() {
            summary.push_str(&format!(" ({})", answer.abstract_url));
        }
        sections.push(summary);
    }

    let mut related = Vec::new();
    flatten_topics(&answer.related_topics, &mut related);
    sections.extend(
        related
            .into_iter()
            .take(MAX_RELATED_TOPICS)
            .map(|t| format!("- {t}")),
    );

    if sections.is_empty() {
        return Ok("No good DuckDuckGo Search Result was found".to_string());
    }
    Ok(sections.join("\n"))
}

/// Wikipedia search returning the intro of the best matching pages
pub async fn wikipedia(
    http: &reqwest::Client,
    base: &str,
    query: &str,
) -> Result<String, ToolError> {
    let limit = MAX_RESULTS.to_string();
    let body: JsonValue = get_json(
        http,
        base,
        &[
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
        ],
    )
    .await?;

    let mut pages: Vec<&JsonValue> = body["query"]["pages"]
        .as_object()
        .map(|pages| pages.values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|page| page["index"].as_u64().unwrap_or(u64::MAX));

    let summaries: Vec<String> = pages
        .into_iter()
        .filter_map(|page| {
            let title = page["title"].as_str()?;
            let extract = page["extract"].as_str().unwrap_or("").trim();
            Some(format!("Page: {title}\nSummary: {extract}"))
        })
        .collect();

    if summaries.is_empty() {
        return Ok("No good Wikipedia Search Result was found".to_string());
    }
    Ok(summaries.join("\n\n"))
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// PubMed search: E-utilities esearch for ids, then efetch for abstracts
pub async fn pubmed(http: &reqwest::Client, base: &str, query: &str) -> Result<String, ToolError> {
    let base = base.trim_end_matches('/');
    let limit = MAX_RESULTS.to_string();

    let search: ESearchResponse = get_json(
        http,
        &format!("{base}/esearch.fcgi"),
        &[
            ("db", "pubmed"),
            ("term", query),
            ("retmode", "json"),
            ("retmax", limit.as_str()),
            ("sort", "relevance"),
        ],
    )
    .await?;

    if search.esearchresult.idlist.is_empty() {
        return Ok("No good PubMed Result was found".to_string());
    }

    let ids = search.esearchresult.idlist.join(",");
    let abstracts = get_text(
        http,
        &format!("{base}/efetch.fcgi"),
        &[
            ("db", "pubmed"),
            ("id", ids.as_str()),
            ("rettype", "abstract"),
            ("retmode", "text"),
        ],
    )
    .await?;

    Ok(abstracts.trim().to_string())
}

#[derive(Debug, Default)]
struct ArxivEntry {
    published: String,
    title: String,
    summary: String,
}

#[derive(Debug, Clone, Copy)]
enum ArxivField {
    Published,
    Title,
    Summary,
}

/// Pull entries out of an arXiv Atom feed
fn parse_arxiv_feed(xml: &str) -> Result<Vec<ArxivEntry>, ToolError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut field: Option<ArxivField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(ArxivEntry::default()),
                b"published" => field = Some(ArxivField::Published),
                b"title" => field = Some(ArxivField::Title),
                b"summary" => field = Some(ArxivField::Summary),
                _ => {}
            },
            Ok(Event::Text(text)) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                    let text = text
                        .unescape()
                        .map_err(|e| ToolError::Parse(format!("arXiv feed: {e}")))?;
                    let target = match field {
                        ArxivField::Published => &mut entry.published,
                        ArxivField::Title => &mut entry.title,
                        ArxivField::Summary => &mut entry.summary,
                    };
                    target.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => entries.extend(current.take()),
                b"published" | b"title" | b"summary" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ToolError::Parse(format!("arXiv feed: {e}"))),
            _ => {}
        }
    }

    Ok(entries)
}

/// arXiv search over all fields
pub async fn arxiv(http: &reqwest::Client, base: &str, query: &str) -> Result<String, ToolError> {
    let search = format!("all:{query}");
    let limit = MAX_RESULTS.to_string();
    let feed = get_text(
        http,
        base,
        &[
            ("search_query", search.as_str()),
            ("start", "0"),
            ("max_results", limit.as_str()),
        ],
    )
    .await?;

    let entries = parse_arxiv_feed(&feed)?;
    if entries.is_empty() {
        return Ok("No good Arxiv Result was found".to_string());
    }

    Ok(entries
        .iter()
        .map(|entry| {
            let published = entry.published.get(..10).unwrap_or(&entry.published);
            format!(
                "Published: {published}\nTitle: {}\nSummary: {}",
                collapse_whitespace(&entry.title),
                collapse_whitespace(&entry.summary)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::collections::HashMap;

    const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: search_query=all:diabetes</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <published>2021-01-01T00:00:00Z</published>
    <title>Predicting   HbA1c
      from EHR data</title>
    <summary>We model &amp; predict glycated haemoglobin.</summary>
  </entry>
  <entry>
    <published>2020-05-05T00:00:00Z</published>
    <title>Insulin dosing</title>
    <summary>Closed loop control.</summary>
  </entry>
</feed>"#;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_parse_arxiv_feed() {
        let entries = parse_arxiv_feed(ATOM_FEED).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(collapse_whitespace(&entries[0].title), "Predicting HbA1c from EHR data");
        assert_eq!(entries[0].summary, "We model & predict glycated haemoglobin.");
        assert_eq!(entries[1].published, "2020-05-05T00:00:00Z");
    }

    #[tokio::test]
    async fn test_arxiv_formats_entries() {
        let router = Router::new().route(
            "/api/query",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["search_query"], "all:diabetes");
                ATOM_FEED
            }),
        );
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let text = arxiv(&http, &format!("{base}/api/query"), "diabetes")
            .await
            .unwrap();
        assert!(text.starts_with("Published: 2021-01-01\nTitle: Predicting HbA1c from EHR data"));
        assert!(text.contains("Title: Insulin dosing"));
    }

    #[tokio::test]
    async fn test_duckduckgo_uses_abstract_and_topics() {
        let router = Router::new().route(
            "/",
            get(|| async {
                r#"{"Heading":"Diabetes","AbstractText":"A metabolic disease.","AbstractURL":"https://example.org/d",
                    "RelatedTopics":[{"Text":"Type 1 diabetes"},{"Name":"Group","Topics":[{"Text":"Type 2 diabetes"}]}]}"#
            }),
        );
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let text = duckduckgo(&http, &format!("{base}/"), "diabetes")
            .await
            .unwrap();
        assert_eq!(
            text,
            "Diabetes: A metabolic disease. (https://example.org/d)\n- Type 1 diabetes\n- Type 2 diabetes"
        );
    }

    #[tokio::test]
    async fn test_duckduckgo_empty_result() {
        let router = Router::new().route("/", get(|| async { r#"{"AbstractText":""}"# }));
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let text = duckduckgo(&http, &base, "zzzz").await.unwrap();
        assert_eq!(text, "No good DuckDuckGo Search Result was found");
    }

    #[tokio::test]
    async fn test_wikipedia_orders_pages_by_rank() {
        let router = Router::new().route(
            "/w/api.php",
            get(|| async {
                r#"{"query":{"pages":{
                    "2":{"title":"Insulin","index":2,"extract":"A hormone."},
                    "1":{"title":"Diabetes","index":1,"extract":"A disease."}}}}"#
            }),
        );
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let text = wikipedia(&http, &format!("{base}/w/api.php"), "diabetes")
            .await
            .unwrap();
        assert_eq!(
            text,
            "Page: Diabetes\nSummary: A disease.\n\nPage: Insulin\nSummary: A hormone."
        );
    }

    #[tokio::test]
    async fn test_pubmed_fetches_abstracts_for_ids() {
        let router = Router::new()
            .route(
                "/esearch.fcgi",
                get(|| async { r#"{"esearchresult":{"idlist":["111","222"]}}"# }),
            )
            .route(
                "/efetch.fcgi",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    format!("Abstracts for {}\n", params["id"])
                }),
            );
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let text = pubmed(&http, &base, "metformin").await.unwrap();
        assert_eq!(text, "Abstracts for 111,222");
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let router = Router::new().route(
            "/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let base = spawn(router).await;

        let http = reqwest::Client::new();
        let err = duckduckgo(&http, &base, "x").await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { status: 503, .. }));
    }
}
