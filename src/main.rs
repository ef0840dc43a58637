use std::io::Read;

use anyhow::Context;
use clap::Parser;

use ai_code_review::cli::args::Args;
use ai_code_review::infrastructure::config::AppConfig;
use ai_code_review::infrastructure::logging::setup_logging;
use ai_code_review::infrastructure::redact::redact_secrets;
use ai_code_review::review::input::ReviewRequest;
use ai_code_review::review::service::ReviewService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = setup_logging(tracing::Level::INFO) {
        eprintln!("Failed to init logging: {}", e);
    }

    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let request = match load_request(&args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{}", redact_secrets(&format!("{:#}", e)));
            return 2;
        }
    };

    let config = AppConfig::from_env();
    let service = match ReviewService::new(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", redact_secrets(&e.to_string()));
            return 1;
        }
    };

    match service.review(request).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Failed to serialize review output: {}", e);
                1
            }
        },
        Err(error) => {
            tracing::error!(
                status = error.status_code(),
                error = %redact_secrets(&error.to_string()),
                "Review failed"
            );
            eprintln!("{}", redact_secrets(&error.to_error_body().to_string()));
            if error.status_code() == 400 {
                2
            } else {
                1
            }
        }
    }
}

/// 从文件或 stdin 读取请求，命令行参数覆盖对应字段
fn load_request(args: &Args) -> anyhow::Result<ReviewRequest> {
    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            buffer
        }
    };

    let mut request: ReviewRequest =
        serde_json::from_str(&text).context("Request is not valid JSON")?;

    if let Some(api_key) = &args.api_key {
        request.api_key = Some(api_key.clone());
    }
    if let Some(model) = &args.model {
        request.model = Some(model.clone());
    }
    if let Some(ruleset) = &args.ruleset {
        request.ruleset = Some(ruleset.clone());
    }

    Ok(request)
}
