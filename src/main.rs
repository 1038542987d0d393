// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Heijastus CLI - Reflected XSS Probe Engine
//!
//! Thin front end over the heijastus library: builds a scan config from
//! command-line arguments, runs one scan and prints or exports the results.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use heijastus::{
    ContextTag, Error, ReportFormat, Result, ScanConfigBuilder, ScanCoordinator, ScanReport,
    ScanRequestConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_usage();
        return ExitCode::from(1);
    };

    match command.as_str() {
        "scan" => match ScanArgs::parse(&args[1..]) {
            Ok(scan_args) => run_scan(scan_args).await,
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("Usage: heijastus scan <url> [OPTIONS] (see `heijastus help`)");
                ExitCode::from(1)
            }
        },
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("heijastus {}", heijastus::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "heijastus=info".parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!(
        r#"Heijastus - Reflected XSS Probe Engine

USAGE:
    heijastus scan <url> [OPTIONS]

COMMANDS:
    scan <url>      Probe every parameter of <url> for reflected XSS
    help            Show this help message
    version         Show version information

SCAN OPTIONS:
    -X, --method <GET|POST>     Request method (default: GET)
    -p, --params <a=1&b=2>      Base parameters, repeatable
        --inherit-query         Also probe parameters already in <url>
    -H, --header <Name: value>  Request header, repeatable
        --headers <block>       Headers as JSON object or 'Name: value' lines
    -A, --user-agent <UA>       User agent (default: Heijastus/<version>)
    -b, --cookies <block>       Cookies as JSON object or 'name: value' lines
    -c, --contexts <list>       Payload contexts: text,attr-value,attr-name,js
    -t, --concurrency <N>       Probes in flight, 1-10 (default: 3)
        --timeout <SECS>        Per-request timeout (default: 8)
        --json-body             Send POST bodies as JSON
        --marker-length <N>     Marker length, 4-32 (default: 6)
        --seed <N>              Seed marker generation
    -o, --output <PATH>         Write report to PATH
        --format <html|json>    Report format (default: from PATH extension)

EXIT STATUS:
    0   no unsafe reflection found
    2   at least one unsafe reflection found
    1   usage or configuration error

EXAMPLES:
    heijastus scan "https://example.com/search" -p "q=test&lang=en"
    heijastus scan https://example.com/comment -X POST -p "name=a&body=b" --json-body
    heijastus scan "https://example.com/?q=1" --inherit-query -o report.html
"#
    );
}

/// Parsed `scan` arguments
struct ScanArgs {
    builder: ScanConfigBuilder,
    seed: Option<u64>,
    output: Option<PathBuf>,
    format: Option<ReportFormat>,
}

impl ScanArgs {
    fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        let url = iter
            .next()
            .filter(|arg| !arg.starts_with('-'))
            .ok_or_else(|| Error::config("Missing target URL"))?;

        let mut builder = ScanRequestConfig::builder(url.as_str());
        let mut seed = None;
        let mut output = None;
        let mut format = None;

        while let Some(flag) = iter.next() {
            let mut value = || {
                iter.next()
                    .cloned()
                    .ok_or_else(|| Error::config(format!("Missing value for {}", flag)))
            };

            builder = match flag.as_str() {
                "-X" | "--method" => builder.method(value()?.parse()?),
                "-p" | "--params" => builder.params_from_query(&value()?),
                "--inherit-query" => builder.inherit_query_params(),
                "-H" | "--header" => {
                    let raw = value()?;
                    let (name, header_value) = raw.split_once(':').ok_or_else(|| {
                        Error::config(format!("Header must be 'Name: value': {}", raw))
                    })?;
                    builder.header(name.trim(), header_value.trim())
                }
                "--headers" => builder.headers_block(&value()?)?,
                "-A" | "--user-agent" => builder.user_agent(value()?),
                "-b" | "--cookies" => builder.cookies_block(&value()?)?,
                "-c" | "--contexts" => {
                    let contexts = value()?
                        .split(',')
                        .filter(|tag| !tag.trim().is_empty())
                        .map(str::parse)
                        .collect::<Result<Vec<ContextTag>>>()?;
                    builder.contexts(&contexts)
                }
                "-t" | "--concurrency" => builder.concurrency(parse_number(flag, &value()?)?),
                "--timeout" => {
                    builder.timeout(Duration::from_secs(parse_number(flag, &value()?)?))
                }
                "--json-body" => builder.json_body(true),
                "--marker-length" => builder.marker_length(parse_number(flag, &value()?)?),
                "--seed" => {
                    seed = Some(parse_number(flag, &value()?)?);
                    builder
                }
                "-o" | "--output" => {
                    output = Some(PathBuf::from(value()?));
                    builder
                }
                "--format" => {
                    format = Some(value()?.parse()?);
                    builder
                }
                other => return Err(Error::config(format!("Unknown option: {}", other))),
            };
        }

        Ok(Self {
            builder,
            seed,
            output,
            format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::config(format!("{} expects a number, got '{}'", flag, raw)))
}

async fn run_scan(args: ScanArgs) -> ExitCode {
    let config = match args.builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid scan configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    if config.params().is_empty() {
        eprintln!("No parameters to probe: pass -p or --inherit-query");
        return ExitCode::from(1);
    }

    let mut coordinator = match ScanCoordinator::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            return ExitCode::from(1);
        }
    };
    if let Some(seed) = args.seed {
        coordinator = coordinator.seed(seed);
    }

    println!(
        "Scanning: {} {} ({} probes)",
        config.method(),
        config.target_url(),
        config.probe_count()
    );

    let report = coordinator.run(&config).await;
    print_report(&report);

    if let Some(path) = args.output {
        let format = args
            .format
            .unwrap_or_else(|| ReportFormat::from_path(&path));
        if let Err(e) = heijastus::export(&report, format, &path) {
            eprintln!("Failed to write report: {}", e);
            return ExitCode::from(1);
        }
        println!("Report written to {}", path.display());
    }

    if report.is_vulnerable() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_report(report: &ScanReport) {
    let unsafe_results = report.unsafe_results();
    let failed = report.failed_results();

    println!("\n=== Results ({} probes, marker {}) ===", report.results.len(), report.marker);

    if unsafe_results.is_empty() {
        println!("\n[OK] No unsafe reflections detected");
    } else {
        println!("\n[!] Unsafe reflections:");
        for result in &unsafe_results {
            println!("  {}", result.summary());
            if !result.snippet.is_empty() {
                println!(
                    "    Snippet: {}",
                    result.snippet.chars().take(120).collect::<String>()
                );
            }
        }
    }

    if !failed.is_empty() {
        println!("\n[?] Failed probes: {}", failed.len());
        for result in failed.iter().take(5) {
            println!("  {}", result.summary());
        }
        if failed.len() > 5 {
            println!("  ... and {} more", failed.len() - 5);
        }
    }

    println!(
        "\nSummary: {} unsafe, {} failed, {} safe ({}ms)",
        unsafe_results.len(),
        failed.len(),
        report.results.len() - unsafe_results.len() - failed.len(),
        report.duration_ms()
    );
}
