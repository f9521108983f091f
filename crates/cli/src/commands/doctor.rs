//! `chatrelay doctor` — Diagnose configuration and service reachability.

use chatrelay_config::AppConfig;
use chatrelay_core::generator::Generator;
use chatrelay_core::history::HistoryStore;
use chatrelay_history::SqliteHistory;
use chatrelay_relay::OllamaGenerator;
use std::path::PathBuf;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("chatrelay doctor");
    println!("================\n");

    let mut issues = 0;

    // Config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(config) => {
            println!("  ok  configuration valid");
            config
        }
        Err(e) => {
            println!("  !!  configuration invalid: {e}");
            return Err(e.into());
        }
    };

    // Upstream generation service
    let generator = OllamaGenerator::new(config.upstream.base_url.clone());
    match generator.health_check().await {
        Ok(true) => println!("  ok  generation service reachable at {}", config.upstream.base_url),
        Ok(false) => {
            println!("  !!  generation service responded with an error");
            issues += 1;
        }
        Err(e) => {
            println!("  !!  generation service unreachable: {e}");
            issues += 1;
        }
    }

    // History store (sqlite only; a postgres deployment is checked by its own tooling)
    if config.history.backend == "sqlite" {
        match SqliteHistory::new(&config.history.url, config.history.capacity).await {
            Ok(store) => match store.count("doctor").await {
                Ok(_) => println!("  ok  history store at {}", config.history.url),
                Err(e) => {
                    println!("  !!  history store query failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  !!  history store unavailable: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  --  history backend '{}' not probed", config.history.backend);
    }

    println!();
    if issues == 0 {
        println!("  all checks passed");
    } else {
        println!("  {issues} issue(s) found");
    }

    Ok(())
}
