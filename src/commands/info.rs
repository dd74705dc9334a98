use colored::Colorize;

use drydock::config::Config;

pub fn run(config: &Config) -> anyhow::Result<()> {
    println!("{}", "drydock".bold());
    println!("  {}", env!("CARGO_PKG_DESCRIPTION"));
    println!("  version:  {}", env!("CARGO_PKG_VERSION"));
    println!("  master:   {}", config.master_url);
    println!(
        "  auth:     {}",
        if config.auth_token.is_some() {
            "token".green()
        } else {
            "none".dimmed()
        }
    );
    println!(
        "  policy:   {}",
        if config.maintenance.implicit_transitions {
            "flush before up, schedule before down"
        } else {
            "strict (no implicit flush or schedule)"
        }
    );
    Ok(())
}
