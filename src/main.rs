mod bdc_config;
mod bdc_controllers;
mod bdc_countdown;
mod bdc_display;
mod bdc_gui;
mod bdc_models;
mod bdc_views;

use bdc_config::Config;
use bdc_controllers::BDCControllers;
use clap::Parser;

fn main() {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\nThe display encountered an unexpected error:");
        eprintln!("{}", panic_info);
        eprintln!("\n💡 Troubleshooting:");
        eprintln!("  • Please restart the display");
        eprintln!("  • Check that the bus info API is reachable");
        eprintln!("  • Run with RUST_LOG=debug for more detail");
        eprintln!("\n{}", "═".repeat(70));
    }));

    // .env is optional
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::parse();
    log::info!(
        "Starting bus display: {} every {}s",
        config.api_url,
        config.refresh_secs
    );

    let outcome = std::panic::catch_unwind(|| {
        if config.gui {
            bdc_gui::run_gui(&config)
        } else {
            BDCControllers::run(&config)
        }
    });

    match outcome {
        Ok(Ok(())) => {
            // Normal exit
        }
        Ok(Err(e)) => {
            eprintln!("\n✗ {:#}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("\n⚠️  Application terminated unexpectedly");
            std::process::exit(1);
        }
    }
}
