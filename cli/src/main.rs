//! Smarter CLI - declarative manifests for AI chatbot resources

use clap::Parser;

use smarter_cli::cli::Cli;
use smarter_cli::domain::BrokerError;
use smarter_cli::output::json::{format_error, format_error_body};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.wants_json();
    if let Err(e) = cli.run().await {
        let broker = e.downcast_ref::<BrokerError>();
        if json {
            let rendered = match broker {
                Some(err) => format_error_body(&err.to_body(true)),
                None => format_error(&format!("{e:#}"), "CommandError"),
            };
            match rendered {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
            for field in broker.map(BrokerError::fields).unwrap_or_default() {
                eprintln!("  {}: {}", field.path, field.message);
            }
        }
        std::process::exit(1);
    }
}
