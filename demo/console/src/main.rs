use serde_json::{json, Value};
use std::sync::Arc;
use switchboard_core::telemetry::{init_logging, DEFAULT_LOG_FILTER};
use switchboard_core::{build_dispatcher, Dispatcher, SwitchboardConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// One console command: `<tool> [json-params]`
#[derive(Debug, PartialEq)]
struct Invocation {
    tool: String,
    params: Value,
}

fn parse_invocation(line: &str) -> Result<Option<Invocation>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (tool, rest) = match line.split_once(char::is_whitespace) {
        Some((tool, rest)) => (tool, rest.trim()),
        None => (line, ""),
    };
    let params = if rest.is_empty() {
        json!({})
    } else {
        serde_json::from_str(rest).map_err(|e| format!("Invalid JSON parameters: {}", e))?
    };
    Ok(Some(Invocation {
        tool: tool.to_string(),
        params,
    }))
}

fn print_tools(dispatcher: &Dispatcher) {
    let caps = dispatcher.capabilities();
    println!(
        "capabilities: {}",
        serde_json::to_string(&caps).unwrap_or_default()
    );
    for def in dispatcher.tool_definitions() {
        println!("  {:<18} {}", def.name, def.description);
    }
}

async fn run(dispatcher: &Dispatcher, invocation: Invocation) {
    let result = dispatcher
        .execute_tool(&invocation.tool, invocation.params)
        .await;
    match serde_json::to_string_pretty(&result) {
        Ok(s) => println!("{}", s),
        Err(e) => warn!(target: "switchboard_console", error = %e, "Failed to render result"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenvy::dotenv();
    init_logging(&format!("{},switchboard_console=info", DEFAULT_LOG_FILTER))?;

    let config = SwitchboardConfig::load();
    let dispatcher = build_dispatcher(&config);

    dispatcher.subscribe(|snap| {
        if snap.is_executing {
            info!(
                target: "switchboard_console",
                tool = snap.last_tool_used.as_deref().unwrap_or("-"),
                "Running"
            );
        }
    });
    dispatcher.set_model_switch_handler(Arc::new(|model: &str| {
        info!(target: "switchboard_console", model = %model, "Active model changed");
    }));

    // One-shot mode: switchboard-console <tool> [json-params]
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        match parse_invocation(&args.join(" "))? {
            Some(invocation) => run(&dispatcher, invocation).await,
            None => print_tools(&dispatcher),
        }
        return Ok(());
    }

    print_tools(&dispatcher);
    println!("enter `<tool> [json-params]`, `tools`, or `quit`");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "quit" | "exit" => break,
            "tools" => {
                print_tools(&dispatcher);
                continue;
            }
            _ => {}
        }
        match parse_invocation(&line) {
            Ok(Some(invocation)) => run(&dispatcher, invocation).await,
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    info!(target: "switchboard_console", "Bye");
    Ok(())
}
