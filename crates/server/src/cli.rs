//! Interactive terminal session

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::startup::Components;

const REQUEST_PROMPT: &str = "\nEnter your request for clinical data (or type 'exit' to quit): ";

/// One line read from the terminal
enum Input {
    Line(String),
    NotUtf8,
    Eof,
}

async fn read_input<R: AsyncBufRead + Unpin>(
    input: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Input> {
    buf.clear();
    if input.read_until(b'\n', buf).await? == 0 {
        return Ok(Input::Eof);
    }
    Ok(match std::str::from_utf8(buf) {
        Ok(line) => Input::Line(line.trim().to_string()),
        Err(_) => Input::NotUtf8,
    })
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

/// Read scenarios line by line until `exit` or end of input.
///
/// Generation failures are printed and the loop continues; only I/O errors
/// on the terminal itself end the session with an error.
pub async fn run_repl<R, W>(app: &Components, mut input: R, output: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    say(
        output,
        &format!(
            "Web tools enabled: {} (the model calls them as needed).\n",
            app.pipeline.tool_names().join(", ")
        ),
    )
    .await?;

    loop {
        say(output, REQUEST_PROMPT).await?;

        let line = match read_input(&mut input, &mut buf).await? {
            Input::Line(line) => line,
            Input::NotUtf8 => {
                say(output, "Input was not valid UTF-8, please try again.\n").await?;
                continue;
            }
            Input::Eof => {
                say(output, "\nExiting interactive session.\n").await?;
                return Ok(());
            }
        };
        let scenario = line.as_str();

        if scenario.eq_ignore_ascii_case("exit") {
            say(output, "Exiting interactive session.\n").await?;
            return Ok(());
        }
        if scenario.is_empty() {
            say(output, "Please enter a valid request.\n").await?;
            continue;
        }

        say(output, &format!("Processing your request: {scenario}\n")).await?;

        let generation = match app.pipeline.generate(scenario, None).await {
            Ok(generation) => generation,
            Err(e) => {
                say(output, &format!("An error occurred during data generation: {e}\n")).await?;
                continue;
            }
        };

        let mut report = format!(
            "\n--- Generated Clinical Data ({}) ---\n{}\n",
            generation.output.kind.as_str(),
            generation.output.rendered
        );
        if !generation.tools_used.is_empty() {
            report.push_str(&format!("Tools used: {}\n", generation.tools_used.join(", ")));
        }
        say(output, &report).await?;

        let Some(document) = &generation.output.document else {
            continue;
        };

        let mut prompt =
            "\nOptional: enter a FHIR endpoint URL to POST this bundle to (press Enter to ".to_string();
        if let Some(default) = &app.default_endpoint {
            prompt.push_str(&format!("use default '{default}' or "));
        }
        prompt.push_str("skip): ");
        say(output, &prompt).await?;

        let endpoint = match read_input(&mut input, &mut buf).await? {
            Input::Line(typed) if !typed.is_empty() => Some(typed),
            Input::Line(_) | Input::Eof => app.default_endpoint.clone(),
            Input::NotUtf8 => {
                say(output, "Endpoint was not valid UTF-8, skipping the POST.\n").await?;
                None
            }
        };
        let Some(endpoint) = endpoint else {
            continue;
        };

        if let Some(report) = generation.posted_to(&endpoint) {
            say(
                output,
                &format!(
                    "The agent already POSTed this bundle to {endpoint} (status {}).\n",
                    report.status
                ),
            )
            .await?;
            continue;
        }

        let message = match app.fhir.post(&endpoint, document).await {
            Ok(report) => {
                let mut message = format!("POSTed bundle to {endpoint} (status {}).\n", report.status);
                if let Some(outcome) = &report.outcome {
                    message.push_str(&outcome.summary());
                    message.push('\n');
                }
                message
            }
            Err(e) => format!("Failed to POST bundle to endpoint: {e}\n"),
        };
        say(output, &message).await?;
    }
}
