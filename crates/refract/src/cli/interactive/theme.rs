//! Dialoguer theme and banner for interactive mode.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;
use refract_core::Config;

/// A `ColorfulTheme` in Refract's colors: magenta prompts, green values.
pub fn refract_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().magenta(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().magenta(),
        active_item_style: Style::new().for_stderr().magenta(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Print the version banner and the four roots to stderr.
pub fn print_banner(config: &Config) {
    let title = format!("Refract v{}", refract_core::VERSION);
    let width = title.len().max(32) + 4;
    let magenta = Style::new().for_stderr().magenta();
    let dim = Style::new().for_stderr().dim();

    eprintln!();
    eprintln!("{}", magenta.apply_to(format!("  ┌{:─<width$}┐", "")));
    eprintln!("{}", magenta.apply_to(format!("  │{title:^width$}│")));
    eprintln!("{}", magenta.apply_to(format!("  └{:─<width$}┘", "")));
    eprintln!();

    let roots = [
        ("Images", config.source_dir()),
        ("Text", config.text_dir()),
        ("Output", config.output_dir()),
        ("Metadata", config.metadata_dir()),
    ];
    for (name, path) in roots {
        let note = if path.is_dir() { "" } else { " (missing)" };
        eprintln!("    {name:<10} {}{}", path.display(), dim.apply_to(note));
    }
    eprintln!();
}
