//! HTML form page

/// Result panel contents
#[derive(Debug, Default)]
pub struct ResultView {
    pub kind: String,
    pub rendered: String,
    pub tools_used: Vec<String>,
    pub resources: Vec<String>,
    /// FHIR POST report or failure, when a post was attempted
    pub post: Option<String>,
}

/// Everything the page can show
#[derive(Debug, Default)]
pub struct PageView {
    pub query: String,
    pub endpoint: String,
    pub result: Option<ResultView>,
    pub error: Option<String>,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HEAD: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Synthetic Clinical Data Generator</title>
    <style>
      body { font-family: system-ui, -apple-system, "Segoe UI", sans-serif; margin: 2rem; max-width: 960px; }
      textarea { width: 100%; min-height: 120px; }
      input[type=url] { width: 100%; }
      pre { white-space: pre-wrap; word-wrap: break-word; padding: 1rem; background: #f5f5f5; border-radius: 4px; }
      .meta { font-size: 0.9rem; color: #555; margin-bottom: 0.5rem; }
      .error { padding: 1rem; background: #fdecea; color: #611a15; border-radius: 4px; }
      button { padding: 0.5rem 1.25rem; font-size: 1rem; }
    </style>
  </head>
  <body>
    <h1>Synthetic Clinical Data Generator</h1>
    <p>Describe the patient condition and demographics. You can also request FHIR output, for example:</p>
    <ul>
      <li>Natural language: <code>Generate natural language data for a 45-year-old male with type 2 diabetes and hypertension.</code></li>
      <li>FHIR: <code>Generate FHIR data for a 60-year-old female with osteoporosis.</code></li>
    </ul>
"#;

pub fn render_page(view: &PageView) -> String {
    let mut html = String::from(HEAD);

    html.push_str(&format!(
        r#"    <form method="post" action="/generate">
      <label for="query"><strong>Your prompt</strong></label><br />
      <textarea id="query" name="query" required>{}</textarea><br /><br />
      <label for="endpoint">FHIR endpoint to POST a generated bundle to (optional)</label><br />
      <input type="url" id="endpoint" name="endpoint" value="{}" /><br /><br />
      <button type="submit">Generate Clinical Data</button>
    </form>
"#,
        escape_html(&view.query),
        escape_html(&view.endpoint)
    ));

    if let Some(error) = &view.error {
        html.push_str(&format!(
            "    <hr />\n    <div class=\"error\">{}</div>\n",
            escape_html(error)
        ));
    }

    if let Some(result) = &view.result {
        let tools = if result.tools_used.is_empty() {
            "none".to_string()
        } else {
            result.tools_used.join(", ")
        };
        html.push_str("    <hr />\n");
        html.push_str(&format!(
            "    <div class=\"meta\">Output: {} &middot; Tools used: {}</div>\n",
            escape_html(&result.kind),
            escape_html(&tools)
        ));
        if !result.resources.is_empty() {
            html.push_str(&format!(
                "    <div class=\"meta\">Resources: {}</div>\n",
                escape_html(&result.resources.join(", "))
            ));
        }
        if let Some(post) = &result.post {
            html.push_str(&format!("    <div class=\"meta\">{}</div>\n", escape_html(post)));
        }
        html.push_str(&format!(
            "    <h2>Generated Clinical Data</h2>\n    <pre>{}</pre>\n",
            escape_html(&result.rendered)
        ));
    }

    html.push_str("  </body>\n</html>\n");
    html
}
