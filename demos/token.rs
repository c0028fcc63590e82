//! Issue and validate admin tokens from the command line.
//!
//! Loads `.env` automatically if present, otherwise reads from the environment.
//!
//! ```bash
//! cargo run --example token -- generate adminid=1 name=root
//! cargo run --example token -- verify eyJhbG...
//! RUST_LOG=larke_admin=debug cargo run --example token -- verify eyJhbG...
//! ```

use larke_admin::{ClaimMap, JwtConfig, JwtService};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn main() {
    // Load .env if present; silently ignore if absent.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match JwtConfig::from_env() {
        Ok(c) => c,
        Err(e) => fail(&e.to_string()),
    };
    let service = JwtService::new(config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else { usage() };

    match command.as_str() {
        "generate" => {
            let mut custom = ClaimMap::new();
            for pair in &args[1..] {
                let Some((k, v)) = pair.split_once('=') else { usage() };
                // Numbers and booleans keep their JSON type.
                let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.into()));
                custom.insert(k.into(), value);
            }
            match service.issue(custom) {
                Ok(token) => println!("{token}"),
                Err(e) => fail(&e.to_string()),
            }
        }
        "verify" => {
            let token = args.get(1).unwrap_or_else(|| usage());
            match service.validate(token) {
                Ok(claims) => {
                    println!("Valid\n");
                    for (k, v) in claims.into_map() {
                        println!("  {k:<8}: {v}");
                    }
                }
                Err(e) => fail(&format!("Failed: {e}")),
            }
        }
        _ => usage(),
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  cargo run --example token -- generate [claim=value ...]");
    eprintln!("  cargo run --example token -- verify  <token>");
    std::process::exit(1);
}
