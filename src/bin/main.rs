use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use relaytpx::{
    ClientBuilder, ContentType, Error, NetworkingClient, RelayProxyClient,
    RelayProxyConfiguration, RequestOptions, Response,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "relaytpx")]
#[command(about = "Send an HTTP request and print the classified response")]
#[command(version)]
struct Cli {
    /// Base URL of the API
    #[arg(value_name = "BASE_URL")]
    base_url: String,

    /// Endpoint path, resolved against the base URL
    #[arg(value_name = "ENDPOINT", default_value = "")]
    endpoint: String,

    /// HTTP method to use
    #[arg(short, long, default_value = "get")]
    method: MethodArg,

    /// Query parameters (format: "key=value")
    #[arg(short, long)]
    query: Vec<String>,

    /// Request headers (format: "Name: Value")
    #[arg(short = 'H', long)]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    body: Option<String>,

    /// Content type for the request body
    #[arg(long, default_value = "json")]
    content_type: ContentTypeArg,

    /// Timeout in seconds
    #[arg(short, long, default_value = "300")]
    timeout: u64,

    /// Send the request through this relay proxy
    #[arg(long, value_name = "URL")]
    relay: Option<String>,

    /// Ask the relay to keep the body, even for DELETE
    #[arg(long, requires = "relay")]
    include_body: bool,

    /// Ask the relay to expose every response header
    #[arg(long, requires = "relay")]
    bypass_expose_headers: bool,

    /// Show response headers
    #[arg(long)]
    show_headers: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy)]
enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(ValueEnum, Clone, Copy)]
enum ContentTypeArg {
    Json,
    Text,
    Jpeg,
    Png,
    Binary,
}

impl From<ContentTypeArg> for ContentType {
    fn from(arg: ContentTypeArg) -> Self {
        match arg {
            ContentTypeArg::Json => ContentType::Json,
            ContentTypeArg::Text => ContentType::PlainText,
            ContentTypeArg::Jpeg => ContentType::Jpeg,
            ContentTypeArg::Png => ContentType::Png,
            ContentTypeArg::Binary => ContentType::Binary,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_pair<'a>(raw: &'a str, separator: char, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    match raw.split_once(separator) {
        Some((name, value)) => Ok((name.trim(), value.trim())),
        None => bail!("invalid {what} {raw:?}, expected a '{separator}' separator"),
    }
}

fn options(cli: &Cli) -> anyhow::Result<RequestOptions> {
    let mut options = RequestOptions::new().content_type(cli.content_type.into());
    for raw in &cli.query {
        let (key, value) = parse_pair(raw, '=', "query parameter")?;
        options = options.query(key, value);
    }
    for raw in &cli.headers {
        let (name, value) = parse_pair(raw, ':', "header")?;
        options = options.header(name, value);
    }
    Ok(options)
}

async fn call(
    client: &dyn NetworkingClient,
    cli: &Cli,
    options: RequestOptions,
) -> relaytpx::Result<Response> {
    let body = cli.body.clone().map(Bytes::from);
    let endpoint = cli.endpoint.as_str();

    match cli.method {
        MethodArg::Get => client.get(endpoint, options).await,
        MethodArg::Post => client.post(endpoint, body, options).await,
        MethodArg::Put => client.put(endpoint, body, options).await,
        MethodArg::Patch => client.patch(endpoint, body, options).await,
        MethodArg::Delete => client.delete(endpoint, options).await,
    }
}

fn describe_body(response: &Response) -> String {
    if response.content_type().is_text() {
        response.text().into_owned()
    } else {
        format!("<{} bytes of {}>", response.body().len(), response.content_type())
    }
}

fn print_text(response: &Response, show_headers: bool) {
    let status = response.status().to_string();
    let status = if response.is_error() {
        status.red().bold()
    } else {
        status.green().bold()
    };
    println!("{} {}", status, response.kind().cyan());

    if show_headers {
        for (name, value) in response.headers().iter() {
            println!("{}: {}", name.dimmed(), value);
        }
        println!();
    }

    println!("{}", describe_body(response));
}

fn print_json(response: &Response, show_headers: bool) -> anyhow::Result<()> {
    let headers: std::collections::BTreeMap<&str, &str> = response.headers().iter().collect();
    let output = serde_json::json!({
        "kind": response.kind(),
        "status": response.status(),
        "content_type": response.content_type().mime(),
        "headers": if show_headers { Some(headers) } else { None },
        "body": describe_body(response),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_error(error: &Error) {
    let label = match error {
        Error::Timeout { .. } => "timeout",
        Error::NoInternetConnection { .. } => "no internet connection",
        Error::Unknown { .. } => "unknown error",
    };
    eprintln!("{} {}", label.red().bold(), error.cause());
    eprintln!("  {}", error.context().to_string().dimmed());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let builder = ClientBuilder::parse(&cli.base_url)
        .context("invalid base URL")?
        .timeout(Duration::from_secs(cli.timeout))
        .user_agent(concat!("relaytpx/", env!("CARGO_PKG_VERSION")));

    let client: Box<dyn NetworkingClient> = match &cli.relay {
        Some(relay) => {
            let relay = RelayProxyConfiguration::parse(relay)?
                .bypass_body_delete(cli.include_body)
                .bypass_expose_headers(cli.bypass_expose_headers);
            Box::new(RelayProxyClient::new(builder, relay)?)
        }
        None => Box::new(builder.build()?),
    };

    let options = options(&cli)?;
    match call(client.as_ref(), &cli, options).await {
        Ok(response) => {
            match cli.format {
                OutputFormat::Text => print_text(&response, cli.show_headers),
                OutputFormat::Json => print_json(&response, cli.show_headers)?,
            }
            if response.is_error() {
                std::process::exit(1);
            }
        }
        Err(error) => {
            print_error(&error);
            std::process::exit(2);
        }
    }

    Ok(())
}
