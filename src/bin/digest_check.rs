//! Preflight for the digest job: reports missing credentials, the template in
//! use and the configured sources without calling any external service.
//! Exits non-zero when something required is missing.

use std::process::ExitCode;

use daily_digest::config;
use daily_digest::render::{HtmlRenderer, TemplateSource};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = match config::load_default() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut ok = true;

    let missing = cfg.missing_credentials();
    if missing.is_empty() {
        println!("credentials: ok");
    } else {
        ok = false;
        for key in &missing {
            println!("credentials: missing {key}");
        }
    }

    let renderer = match &cfg.render.template_path {
        Some(p) => HtmlRenderer::from_path(p),
        None => HtmlRenderer::builtin(),
    };
    match (renderer.load_template().await, renderer.source()) {
        (Ok(_), TemplateSource::Builtin) => println!("template: builtin"),
        (Ok(_), TemplateSource::File(p)) => println!("template: {}", p.display()),
        (Err(e), _) => {
            ok = false;
            println!("template: {e:#}");
        }
    }

    println!("calendars: {}", cfg.calendar.ids.join(", "));
    println!("weather: {}", cfg.weather.city());
    println!(
        "reading list: {} of '{}' -> '{}'",
        cfg.reading_list.sample_size, cfg.reading_list.pending_status, cfg.reading_list.done_status
    );
    println!("model: {}", cfg.ai.model);
    match &cfg.dry_run_path {
        Some(p) => println!("delivery: file {}", p.display()),
        None => println!(
            "delivery: smtp {}:{}",
            cfg.email.smtp_host, cfg.email.smtp_port
        ),
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
