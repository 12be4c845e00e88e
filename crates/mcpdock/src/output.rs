use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mcpdock_agent::Toolset;
use mcpdock_registry::ServerRegistry;
use owo_colors::OwoColorize;

const BAR_CHAR: &str = "▎";

pub fn spinner(message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style);
    progress_bar.set_message(message);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

pub fn print_servers(registry: &ServerRegistry) {
    if registry.is_empty() {
        println!("{}", "No tool servers available.".bright_yellow());
        return;
    }
    for name in registry.server_names() {
        let Some(descriptor) = registry.get_server(name) else {
            continue;
        };
        println!(
            "{}{} {}",
            BAR_CHAR.bright_cyan(),
            name.bright_white().bold(),
            descriptor.handle().cmdline().dimmed()
        );
        println!("{}  {}", BAR_CHAR.bright_cyan(), descriptor.description());
    }
}

pub fn print_tools(toolset: &Toolset) {
    if toolset.is_empty() {
        println!("{}", "No tools available.".bright_yellow());
        return;
    }
    for tool in toolset.definitions() {
        println!("{}🛠️  {}", BAR_CHAR.bright_cyan(), tool.name.bright_white().bold());
        if let Some(description) = &tool.description {
            println!("{}   {}", BAR_CHAR.bright_cyan(), description.dimmed());
        }
    }
}
