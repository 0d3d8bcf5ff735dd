use std::io;
use std::process::ExitCode;

use answer_provider::AnswerTransport;
use anyhow::Context;
use clap::Parser;
use legal_qa::{ClientConfig, ConversationRuntime};
use legal_qa_cli::args::Cli;
use legal_qa_cli::session::{QuestionOutcome, Session};
use legal_qa_cli::transport::transport_for;
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    legal_qa::logging::init(&cli.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ClientConfig::load(cli.config.as_deref(), &cli.to_overrides())
        .context("failed to load configuration")?;
    let transport =
        transport_for(cli.provider, &config).context("failed to set up the answer transport")?;

    let profile = transport.profile();
    tracing::debug!(
        transport = %profile.transport_id,
        endpoint = %profile.endpoint,
        "starting legal-qa"
    );

    let runtime = ConversationRuntime::from_config(transport, &config);
    let mut session = Session::new(runtime, io::stdout());

    if let Some(question) = cli.question.as_deref() {
        let outcome = session
            .ask(question)
            .await
            .context("failed to write the transcript")?;
        return Ok(match outcome {
            QuestionOutcome::Answered => ExitCode::SUCCESS,
            QuestionOutcome::Failed(_) => ExitCode::FAILURE,
        });
    }

    session
        .run_interactive(BufReader::new(tokio::io::stdin()))
        .await
        .context("interactive session failed")?;
    Ok(ExitCode::SUCCESS)
}
